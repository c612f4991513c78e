//! Newline-delimited JSON sink.
//!
//! Layout under the sink directory:
//! - `runs.jsonl`: one line per run, in id order
//! - `samples-<run_id>.jsonl`: one line per sample

use crate::error::SinkError;
use crate::records::{BenchmarkRun, BenchmarkStats, RunId, SampleRecord};
use crate::sink::ResultSink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const RUNS_FILE: &str = "runs.jsonl";
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRun {
    id: RunId,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    run: BenchmarkRun,
}

/// Sink writing JSONL files into a directory.
///
/// File access runs on tokio's blocking pool. Clones share the write lock.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    dir: PathBuf,
    // serializes id assignment and appends
    write_lock: Arc<Mutex<()>>,
}

impl JsonlSink {
    /// Open a sink rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("Writing results to {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn runs_path(&self) -> PathBuf {
        self.dir.join(RUNS_FILE)
    }

    pub fn samples_path(&self, run_id: RunId) -> PathBuf {
        self.dir.join(format!("samples-{run_id}.jsonl"))
    }

    fn read_runs(&self) -> Result<Vec<StoredRun>, SinkError> {
        read_lines(&self.runs_path())
    }

    fn find_run(&self, run_id: RunId) -> Result<Option<StoredRun>, SinkError> {
        Ok(self.read_runs()?.into_iter().find(|r| r.id == run_id))
    }

    /// Every sample recorded for `run_id`; empty if none were written.
    pub fn read_samples(&self, run_id: RunId) -> Result<Vec<SampleRecord>, SinkError> {
        read_lines(&self.samples_path(run_id))
    }
}

/// Parse every non-blank line of `path`. A missing file reads as empty.
fn read_lines<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, SinkError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

fn append_lines<T: Serialize>(path: &Path, items: &[T]) -> Result<(), SinkError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

impl JsonlSink {
    fn write_run(&self, run: BenchmarkRun) -> Result<RunId, SinkError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let id = RunId(self.read_runs()?.len() as i64 + 1);
        let stored = StoredRun {
            id,
            created_at: Utc::now(),
            run,
        };
        append_lines(&self.runs_path(), &[stored])?;

        debug!("Recorded run {} in {}", id, self.runs_path().display());
        Ok(id)
    }

    fn write_samples(&self, run_id: RunId, samples: &[SampleRecord]) -> Result<(), SinkError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.find_run(run_id)?.is_none() {
            return Err(SinkError::UnknownRun(run_id));
        }

        let path = self.samples_path(run_id);
        append_lines(&path, samples)?;
        debug!("Wrote {} samples to {}", samples.len(), path.display());
        Ok(())
    }

    fn read_stats(&self, run_id: RunId) -> Result<Option<BenchmarkStats>, SinkError> {
        let Some(stored) = self.find_run(run_id)? else {
            return Ok(None);
        };
        let samples = self.read_samples(run_id)?;
        Ok(Some(BenchmarkStats::from_records(
            run_id,
            &stored.run,
            &samples,
        )))
    }
}

/// Run file work on the blocking pool so large batches do not stall the
/// async workers.
async fn blocking<T, F>(work: F) -> Result<T, SinkError>
where
    F: FnOnce() -> Result<T, SinkError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SinkError::Blocking(e.to_string()))?
}

#[async_trait]
impl ResultSink for JsonlSink {
    async fn record_run(&self, run: &BenchmarkRun) -> Result<RunId, SinkError> {
        let sink = self.clone();
        let run = run.clone();
        blocking(move || sink.write_run(run)).await
    }

    async fn record_samples(
        &self,
        run_id: RunId,
        samples: &[SampleRecord],
    ) -> Result<(), SinkError> {
        if samples.is_empty() {
            return Ok(());
        }

        let sink = self.clone();
        let samples = samples.to_vec();
        blocking(move || sink.write_samples(run_id, &samples)).await
    }

    async fn get_stats(&self, run_id: RunId) -> Result<Option<BenchmarkStats>, SinkError> {
        let sink = self.clone();
        blocking(move || sink.read_stats(run_id)).await
    }
}
