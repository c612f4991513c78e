//! The `stats` subcommand: summaries of stored runs.

use super::args::StatsArgs;
use anyhow::Context;
use bench_results::{format_latency, BenchmarkStats, RunId, StatsFilter};
use bench_sink_postgresql::PostgresSink;
use comfy_table::{presets::UTF8_FULL, Table};

pub async fn show(args: &StatsArgs) -> anyhow::Result<()> {
    let connection_string = args
        .postgres
        .postgresql_connection_string
        .as_deref()
        .context("stats requires --postgresql-connection-string")?;
    let sink = PostgresSink::connect(connection_string)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let stats = sink
        .get_filtered_stats(&filter_from_args(args))
        .await
        .context("Failed to query benchmark stats")?;
    if stats.is_empty() {
        println!("No benchmark runs match the filter");
    } else {
        println!("{}", render(&stats));
    }
    Ok(())
}

pub fn filter_from_args(args: &StatsArgs) -> StatsFilter {
    StatsFilter {
        scenario: args.scenario.clone(),
        protocol: args.protocol.clone(),
        client: args.client.clone(),
        run_id: args.run_id.map(RunId),
        limit: (args.limit > 0).then_some(args.limit),
    }
}

pub fn render(stats: &[BenchmarkStats]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Run", "Scenario", "Protocol", "Client", "Workers", "Duration", "Samples", "OK", "p50",
        "p90", "p99", "Avg", "CPU", "Mem peak",
    ]);
    for s in stats {
        table.add_row(vec![
            s.run_id.to_string(),
            s.scenario.clone(),
            s.protocol.clone(),
            s.client.clone(),
            s.concurrency.to_string(),
            format!("{}s", s.duration_secs),
            s.total_samples.to_string(),
            s.successful.to_string(),
            format_latency(s.p50_latency_ms),
            format_latency(s.p90_latency_ms),
            format_latency(s.p99_latency_ms),
            format_latency(s.avg_latency_ms),
            s.cpu_usage_avg
                .map(|v| format!("{v:.1}%"))
                .unwrap_or_else(|| "-".to_string()),
            s.memory_mb_peak
                .map(|v| format!("{v:.1}MB"))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}
