//! DDL and queries for the benchmark tables.

pub const CREATE_RUNS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS benchmark_runs (
    id BIGSERIAL PRIMARY KEY,
    scenario TEXT NOT NULL,
    protocol TEXT NOT NULL,
    client TEXT NOT NULL DEFAULT 'rust',
    concurrency INTEGER NOT NULL,
    duration_sec INTEGER NOT NULL,
    rate_limit INTEGER,
    cpu_usage_avg DOUBLE PRECISION,
    memory_mb_avg DOUBLE PRECISION,
    memory_mb_peak DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

pub const CREATE_SAMPLES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS benchmark_samples (
    id BIGSERIAL PRIMARY KEY,
    run_id BIGINT NOT NULL REFERENCES benchmark_runs(id) ON DELETE CASCADE,
    latency_ms DOUBLE PRECISION NOT NULL,
    success BOOLEAN NOT NULL,
    error_type TEXT,
    timestamp TIMESTAMPTZ NOT NULL
)";

pub const CREATE_SAMPLES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_benchmark_samples_run_id ON benchmark_samples (run_id)";

/// Latency figures cover successful samples with a positive latency, the
/// same filter `Results` applies.
pub const CREATE_STATS_VIEW: &str = "\
CREATE OR REPLACE VIEW benchmark_stats AS
SELECT
    r.id AS run_id,
    r.scenario,
    r.protocol,
    r.client,
    r.concurrency,
    r.duration_sec,
    COUNT(s.id) AS total_samples,
    COUNT(s.id) FILTER (WHERE s.success) AS successful,
    COALESCE(percentile_cont(0.50) WITHIN GROUP (ORDER BY s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS p50_latency,
    COALESCE(percentile_cont(0.90) WITHIN GROUP (ORDER BY s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS p90_latency,
    COALESCE(percentile_cont(0.99) WITHIN GROUP (ORDER BY s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS p99_latency,
    COALESCE(AVG(s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS avg_latency,
    COALESCE(MIN(s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS min_latency,
    COALESCE(MAX(s.latency_ms) FILTER (WHERE s.success AND s.latency_ms > 0), 0) AS max_latency,
    r.cpu_usage_avg,
    r.memory_mb_avg,
    r.memory_mb_peak
FROM benchmark_runs r
LEFT JOIN benchmark_samples s ON s.run_id = r.id
GROUP BY r.id";

/// Statements applied by `ensure_schema`, in order.
pub const SCHEMA_STATEMENTS: [&str; 4] = [
    CREATE_RUNS_TABLE,
    CREATE_SAMPLES_TABLE,
    CREATE_SAMPLES_INDEX,
    CREATE_STATS_VIEW,
];

pub const INSERT_RUN: &str = "\
INSERT INTO benchmark_runs
    (scenario, protocol, client, concurrency, duration_sec, rate_limit,
     cpu_usage_avg, memory_mb_avg, memory_mb_peak)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING id";

pub const COPY_SAMPLES: &str = "\
COPY benchmark_samples (run_id, latency_ms, success, error_type, timestamp)
FROM STDIN BINARY";

pub const STATS_COLUMNS: &str = "\
SELECT run_id, scenario, protocol, client, concurrency, duration_sec,
       total_samples, successful,
       p50_latency, p90_latency, p99_latency, avg_latency, min_latency, max_latency,
       cpu_usage_avg, memory_mb_avg, memory_mb_peak
FROM benchmark_stats";

pub const SELECT_ACCOUNT_IDS: &str = "SELECT account_id FROM accounts";
