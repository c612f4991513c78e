//! Console and JSON reports.

use bench_resources::ResourceStats;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Reduced view of one run, ready to print or serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub scenario: String,
    pub protocol: String,
    pub client: String,
    pub concurrency: u32,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Failed share in percent.
    pub error_rate: f64,
    /// Samples per second.
    pub throughput: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resources: Option<ResourceStats>,
}

/// Sub-millisecond values print in microseconds, the rest in milliseconds.
pub fn format_latency(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.2}us", ms * 1000.0)
    } else {
        format!("{ms:.2}ms")
    }
}

impl LatencySummary {
    /// Plain-text report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = writeln!(out, "\nBenchmark: {} / {}", self.scenario, self.protocol);
        let _ = writeln!(
            out,
            "Duration: {}s | Concurrency: {}",
            self.duration_secs.round() as u64,
            self.concurrency
        );
        let _ = writeln!(out, "---------------------------------");
        let _ = writeln!(out, "Requests:    {}", self.total_requests);
        let _ = writeln!(out, "Throughput:  {:.2} req/s", self.throughput);
        let _ = writeln!(out, "Latency:");
        let _ = writeln!(out, "  p50:  {}", format_latency(self.p50_ms));
        let _ = writeln!(out, "  p90:  {}", format_latency(self.p90_ms));
        let _ = writeln!(out, "  p99:  {}", format_latency(self.p99_ms));
        let _ = writeln!(out, "  avg:  {}", format_latency(self.avg_ms));
        let _ = writeln!(out, "  min:  {}", format_latency(self.min_ms));
        let _ = writeln!(out, "  max:  {}", format_latency(self.max_ms));
        let _ = writeln!(
            out,
            "Errors:      {} ({:.2}%)",
            self.failed_requests, self.error_rate
        );

        if let Some(resources) = &self.resources {
            let _ = writeln!(out, "Resources:");
            let _ = writeln!(out, "  CPU avg:   {:.1}%", resources.cpu_avg_percent);
            let _ = writeln!(out, "  Mem avg:   {:.1} MB", resources.memory_avg_mb);
            let _ = writeln!(out, "  Mem peak:  {:.1} MB", resources.memory_peak_mb);
        }
        out
    }

    /// Boxed table report.
    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Metric", "Value"]);

        table.add_row(vec![
            Cell::new("Benchmark"),
            Cell::new(format!("{} / {} ({})", self.scenario, self.protocol, self.client)),
        ]);
        table.add_row(vec![
            Cell::new("Duration"),
            Cell::new(format!("{:.1}s", self.duration_secs)),
        ]);
        table.add_row(vec![Cell::new("Concurrency"), Cell::new(self.concurrency)]);
        table.add_row(vec![Cell::new("Requests"), Cell::new(self.total_requests)]);
        table.add_row(vec![
            Cell::new("Throughput"),
            Cell::new(format!("{:.2} req/s", self.throughput)),
        ]);
        for (label, value) in [
            ("p50", self.p50_ms),
            ("p90", self.p90_ms),
            ("p99", self.p99_ms),
            ("avg", self.avg_ms),
            ("min", self.min_ms),
            ("max", self.max_ms),
        ] {
            table.add_row(vec![Cell::new(label), Cell::new(format_latency(value))]);
        }

        let errors = Cell::new(format!(
            "{} ({:.2}%)",
            self.failed_requests, self.error_rate
        ));
        let errors = if self.failed_requests > 0 {
            errors.fg(Color::Red)
        } else {
            errors.fg(Color::Green)
        };
        table.add_row(vec![Cell::new("Errors"), errors]);

        if let Some(resources) = &self.resources {
            table.add_row(vec![
                Cell::new("CPU avg"),
                Cell::new(format!("{:.1}%", resources.cpu_avg_percent)),
            ]);
            table.add_row(vec![
                Cell::new("Mem avg"),
                Cell::new(format!("{:.1} MB", resources.memory_avg_mb)),
            ]);
            table.add_row(vec![
                Cell::new("Mem peak"),
                Cell::new(format!("{:.1} MB", resources.memory_peak_mb)),
            ]);
        }

        table.to_string()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> LatencySummary {
        LatencySummary {
            scenario: "query".to_string(),
            protocol: "rest".to_string(),
            client: "rust".to_string(),
            concurrency: 10,
            duration_secs: 29.6,
            total_requests: 1000,
            successful_requests: 990,
            failed_requests: 10,
            error_rate: 1.0,
            throughput: 33.78,
            p50_ms: 4.2,
            p90_ms: 9.875,
            p99_ms: 20.0,
            avg_ms: 5.5,
            min_ms: 0.25,
            max_ms: 42.0,
            resources: None,
        }
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(0.25), "250.00us");
        assert_eq!(format_latency(1.0), "1.00ms");
        assert_eq!(format_latency(12.5), "12.50ms");
    }

    #[test]
    fn test_render_layout() {
        let text = summary().render();

        assert!(text.contains("Benchmark: query / rest"));
        assert!(text.contains("Duration: 30s | Concurrency: 10"));
        assert!(text.contains("Requests:    1000"));
        assert!(text.contains("Throughput:  33.78 req/s"));
        assert!(text.contains("  p50:  4.20ms"));
        assert!(text.contains("  min:  250.00us"));
        assert!(text.contains("Errors:      10 (1.00%)"));
        assert!(!text.contains("Resources:"));
    }

    #[test]
    fn test_render_with_resources() {
        let mut summary = summary();
        summary.resources = Some(ResourceStats {
            cpu_avg_percent: 55.55,
            memory_avg_mb: 20.0,
            memory_peak_mb: 24.44,
            sample_count: 10,
            active_tasks: 3,
        });

        let text = summary.render();
        assert!(text.contains("  CPU avg:   55.5%") || text.contains("  CPU avg:   55.6%"));
        assert!(text.contains("  Mem peak:  24.4 MB"));
        assert!(summary.render_table().contains("Mem peak"));
    }

    #[test]
    fn test_table_contains_metrics() {
        let table = summary().render_table();
        assert!(table.contains("Metric"));
        assert!(table.contains("Throughput"));
        assert!(table.contains("33.78 req/s"));
        assert!(table.contains("query / rest (rust)"));
    }

    #[test]
    fn test_json_omits_missing_resources() {
        let json = summary().to_json().unwrap();
        assert!(!json.contains("resources"));

        let parsed: LatencySummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_requests, 1000);
        assert_eq!(parsed.scenario, "query");
        assert!(parsed.resources.is_none());
    }
}
