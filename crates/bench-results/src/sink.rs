//! Result sink interface and the in-memory implementation.

use crate::error::SinkError;
use crate::records::{BenchmarkRun, BenchmarkStats, RunId, SampleRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Destination for run and sample records.
///
/// An empty `record_samples` batch is always a successful no-op.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Store a run and return its identifier.
    async fn record_run(&self, run: &BenchmarkRun) -> Result<RunId, SinkError>;

    /// Store every sample of a run in one batch.
    async fn record_samples(&self, run_id: RunId, samples: &[SampleRecord])
        -> Result<(), SinkError>;

    /// Aggregate stats for a stored run, if the sink can compute them.
    async fn get_stats(&self, _run_id: RunId) -> Result<Option<BenchmarkStats>, SinkError> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    runs: Vec<BenchmarkRun>,
    samples: HashMap<RunId, Vec<SampleRecord>>,
}

/// Sink that keeps everything in process memory. Run ids start at 1.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn runs(&self) -> Vec<BenchmarkRun> {
        self.lock().runs.clone()
    }

    pub fn samples(&self, run_id: RunId) -> Vec<SampleRecord> {
        self.lock()
            .samples
            .get(&run_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn record_run(&self, run: &BenchmarkRun) -> Result<RunId, SinkError> {
        let mut state = self.lock();
        state.runs.push(run.clone());
        Ok(RunId(state.runs.len() as i64))
    }

    async fn record_samples(
        &self,
        run_id: RunId,
        samples: &[SampleRecord],
    ) -> Result<(), SinkError> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut state = self.lock();
        if run_id.0 < 1 || run_id.0 as usize > state.runs.len() {
            return Err(SinkError::UnknownRun(run_id));
        }
        state
            .samples
            .entry(run_id)
            .or_default()
            .extend_from_slice(samples);
        Ok(())
    }

    async fn get_stats(&self, run_id: RunId) -> Result<Option<BenchmarkStats>, SinkError> {
        let state = self.lock();
        let Some(run) = usize::try_from(run_id.0.saturating_sub(1))
            .ok()
            .and_then(|index| state.runs.get(index))
        else {
            return Ok(None);
        };

        let samples = state.samples.get(&run_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Some(BenchmarkStats::from_records(run_id, run, samples)))
    }
}
