//! PostgreSQL implementation of [`ResultSink`].

use crate::error::PostgresSinkError;
use crate::logging::mask_connection_password;
use crate::schema;
use async_trait::async_trait;
use bench_results::{
    BenchmarkRun, BenchmarkStats, ResultSink, RunId, SampleRecord, SinkError, StatsFilter,
};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info};

/// Sink storing runs and samples in PostgreSQL.
pub struct PostgresSink {
    client: Client,
}

impl PostgresSink {
    /// Connect and verify the connection.
    ///
    /// # Arguments
    /// * `connection_string` - e.g. `host=localhost user=benchmark dbname=grpc_benchmark`
    pub async fn connect(connection_string: &str) -> Result<Self, PostgresSinkError> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        client.simple_query("SELECT 1").await?;
        info!(
            "Connected to PostgreSQL at {}",
            mask_connection_password(connection_string)
        );
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create the tables, index, and stats view if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), PostgresSinkError> {
        for statement in schema::SCHEMA_STATEMENTS {
            self.client.batch_execute(statement).await?;
        }
        debug!("Benchmark schema ready");
        Ok(())
    }

    pub async fn insert_run(&self, run: &BenchmarkRun) -> Result<RunId, PostgresSinkError> {
        let concurrency = i32::try_from(run.concurrency).unwrap_or(i32::MAX);
        let duration_sec = i32::try_from(run.duration_secs).unwrap_or(i32::MAX);
        let rate_limit = run
            .rate_limit
            .map(|rate| i32::try_from(rate).unwrap_or(i32::MAX));

        let row = self
            .client
            .query_one(
                schema::INSERT_RUN,
                &[
                    &run.scenario,
                    &run.protocol,
                    &run.client,
                    &concurrency,
                    &duration_sec,
                    &rate_limit,
                    &run.cpu_usage_avg,
                    &run.memory_mb_avg,
                    &run.memory_mb_peak,
                ],
            )
            .await?;

        let id = RunId(row.try_get("id")?);
        info!("Recorded benchmark run {}", id);
        Ok(id)
    }

    /// Bulk insert samples with binary COPY.
    pub async fn copy_samples(
        &self,
        run_id: RunId,
        samples: &[SampleRecord],
    ) -> Result<u64, PostgresSinkError> {
        if samples.is_empty() {
            return Ok(0);
        }

        let sink = self.client.copy_in(schema::COPY_SAMPLES).await?;
        let writer = BinaryCopyInWriter::new(
            sink,
            &[
                Type::INT8,
                Type::FLOAT8,
                Type::BOOL,
                Type::TEXT,
                Type::TIMESTAMPTZ,
            ],
        );
        tokio::pin!(writer);

        for sample in samples {
            writer
                .as_mut()
                .write(&[
                    &run_id.0,
                    &sample.latency_ms,
                    &sample.success,
                    &sample.error_type,
                    &sample.timestamp,
                ])
                .await?;
        }
        let copied = writer.finish().await?;

        let expected = samples.len() as u64;
        if copied != expected {
            return Err(PostgresSinkError::RowCountMismatch { expected, copied });
        }
        debug!("Copied {} samples for run {}", copied, run_id);
        Ok(copied)
    }

    /// Stats for one run from the `benchmark_stats` view.
    pub async fn stats_for_run(
        &self,
        run_id: RunId,
    ) -> Result<Option<BenchmarkStats>, PostgresSinkError> {
        let sql = format!("{} WHERE run_id = $1", schema::STATS_COLUMNS);
        let row = self.client.query_opt(&sql, &[&run_id.0]).await?;
        row.as_ref().map(stats_from_row).transpose()
    }

    /// Stats for every run, newest first.
    pub async fn get_all_stats(&self) -> Result<Vec<BenchmarkStats>, PostgresSinkError> {
        self.get_filtered_stats(&StatsFilter::default()).await
    }

    /// Stats matching `filter`, newest first.
    pub async fn get_filtered_stats(
        &self,
        filter: &StatsFilter,
    ) -> Result<Vec<BenchmarkStats>, PostgresSinkError> {
        let (sql, params) = filtered_stats_query(filter);
        let params: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| &**p as &(dyn ToSql + Sync))
            .collect();

        let rows = self.client.query(&sql, &params).await?;
        rows.iter().map(stats_from_row).collect()
    }

    /// Every account id in the `accounts` table.
    pub async fn load_account_ids(&self) -> Result<Vec<String>, PostgresSinkError> {
        let rows = self.client.query(schema::SELECT_ACCOUNT_IDS, &[]).await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Loaded {} account ids", ids.len());
        Ok(ids)
    }
}

type SqlParam = Box<dyn ToSql + Sync + Send>;

/// Stats query with a positional parameter per filter field that is set.
fn filtered_stats_query(filter: &StatsFilter) -> (String, Vec<SqlParam>) {
    let mut sql = format!("{} WHERE 1=1", schema::STATS_COLUMNS);
    let mut params: Vec<SqlParam> = Vec::new();

    if let Some(run_id) = filter.run_id {
        params.push(Box::new(run_id.0));
        sql.push_str(&format!(" AND run_id = ${}", params.len()));
    }
    for (column, value) in [
        ("scenario", &filter.scenario),
        ("protocol", &filter.protocol),
        ("client", &filter.client),
    ] {
        if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
            params.push(Box::new(value.clone()));
            sql.push_str(&format!(" AND {column} = ${}", params.len()));
        }
    }

    sql.push_str(" ORDER BY run_id DESC");

    if let Some(limit) = filter.limit.filter(|l| *l > 0) {
        params.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ${}", params.len()));
    }

    (sql, params)
}

fn stats_from_row(row: &Row) -> Result<BenchmarkStats, PostgresSinkError> {
    let concurrency: i32 = row.try_get("concurrency")?;
    let duration_sec: i32 = row.try_get("duration_sec")?;

    Ok(BenchmarkStats {
        run_id: RunId(row.try_get("run_id")?),
        scenario: row.try_get("scenario")?,
        protocol: row.try_get("protocol")?,
        client: row.try_get("client")?,
        concurrency: u32::try_from(concurrency).unwrap_or(0),
        duration_secs: u64::try_from(duration_sec).unwrap_or(0),
        total_samples: row.try_get("total_samples")?,
        successful: row.try_get("successful")?,
        p50_latency_ms: row.try_get("p50_latency")?,
        p90_latency_ms: row.try_get("p90_latency")?,
        p99_latency_ms: row.try_get("p99_latency")?,
        avg_latency_ms: row.try_get("avg_latency")?,
        min_latency_ms: row.try_get("min_latency")?,
        max_latency_ms: row.try_get("max_latency")?,
        cpu_usage_avg: row.try_get("cpu_usage_avg")?,
        memory_mb_avg: row.try_get("memory_mb_avg")?,
        memory_mb_peak: row.try_get("memory_mb_peak")?,
    })
}

#[async_trait]
impl ResultSink for PostgresSink {
    async fn record_run(&self, run: &BenchmarkRun) -> Result<RunId, SinkError> {
        Ok(self.insert_run(run).await?)
    }

    async fn record_samples(
        &self,
        run_id: RunId,
        samples: &[SampleRecord],
    ) -> Result<(), SinkError> {
        self.copy_samples(run_id, samples).await?;
        Ok(())
    }

    async fn get_stats(&self, run_id: RunId) -> Result<Option<BenchmarkStats>, SinkError> {
        Ok(self.stats_for_run(run_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_query() {
        let (sql, params) = filtered_stats_query(&StatsFilter::default());
        assert!(sql.ends_with("WHERE 1=1 ORDER BY run_id DESC"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_parameters_are_numbered_in_order() {
        let filter = StatsFilter {
            scenario: Some("query".to_string()),
            protocol: None,
            client: Some("rust".to_string()),
            run_id: Some(RunId(12)),
            limit: Some(5),
        };
        let (sql, params) = filtered_stats_query(&filter);

        assert!(sql.contains("AND run_id = $1 AND scenario = $2 AND client = $3"));
        assert!(sql.ends_with("ORDER BY run_id DESC LIMIT $4"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_strings_and_zero_limit_are_ignored() {
        let filter = StatsFilter {
            scenario: Some(String::new()),
            limit: Some(0),
            ..StatsFilter::default()
        };
        let (sql, params) = filtered_stats_query(&filter);
        assert!(!sql.contains("scenario ="));
        assert!(!sql.contains("LIMIT"));
        assert!(params.is_empty());
    }
}
