//! The `timing` subcommands: generate and inspect inter-arrival files.

use super::args::TimingGenerateArgs;
use anyhow::Context;
use bench_timing::{generate_synthetic, generate_synthetic_seeded, TimingData};
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::Path;
use tracing::info;

pub fn generate(args: &TimingGenerateArgs) -> anyhow::Result<TimingData> {
    let data = match args.seed {
        Some(seed) => generate_synthetic_seeded(args.count, args.mean_ms, args.stddev_ms, seed),
        None => generate_synthetic(args.count, args.mean_ms, args.stddev_ms),
    }
    .context("Failed to generate synthetic timing data")?;

    data.save(&args.output)
        .with_context(|| format!("Failed to write timing data to {:?}", args.output))?;
    info!(
        "Generated {} delays (mean {:.2}ms, p99 {:.2}ms) into {:?}",
        data.len(),
        data.stats.avg_ms,
        data.stats.p99_ms,
        args.output
    );
    Ok(data)
}

pub fn show(path: &Path) -> anyhow::Result<()> {
    let data = TimingData::load(path)
        .with_context(|| format!("Failed to load timing data from {path:?}"))?;
    println!("{}", render(&data));
    Ok(())
}

pub fn render(data: &TimingData) -> String {
    let stats = &data.stats;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["topic".to_string(), data.topic_id.clone()]);
    table.add_row(vec!["network".to_string(), data.network.clone()]);
    table.add_row(vec!["messages".to_string(), data.message_count.to_string()]);
    table.add_row(vec!["delays".to_string(), data.len().to_string()]);
    table.add_row(vec![
        "time span".to_string(),
        format!("{:.1}s", data.time_span_seconds),
    ]);
    table.add_row(vec![
        "avg rate".to_string(),
        format!("{:.2}/s", data.avg_rate_per_second),
    ]);
    for (name, value) in [
        ("min", stats.min_ms),
        ("avg", stats.avg_ms),
        ("p50", stats.p50_ms),
        ("p90", stats.p90_ms),
        ("p99", stats.p99_ms),
        ("max", stats.max_ms),
    ] {
        table.add_row(vec![name.to_string(), format!("{value:.2}ms")]);
    }
    table.to_string()
}
