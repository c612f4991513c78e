//! Resolution of the account ids queried by the query scenario.

use anyhow::Context;
use bench_sink_postgresql::PostgresSink;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the target list comes from, in order of precedence.
#[derive(Clone, Copy)]
pub enum TargetSource<'a> {
    List(&'a [String]),
    File(&'a Path),
    Database(&'a PostgresSink),
    Nothing,
}

impl<'a> TargetSource<'a> {
    pub fn select(
        targets: &'a [String],
        targets_file: Option<&'a PathBuf>,
        database: Option<&'a PostgresSink>,
    ) -> Self {
        if !targets.is_empty() {
            TargetSource::List(targets)
        } else if let Some(path) = targets_file {
            TargetSource::File(path)
        } else if let Some(sink) = database {
            TargetSource::Database(sink)
        } else {
            TargetSource::Nothing
        }
    }

    pub async fn load(self) -> anyhow::Result<Vec<String>> {
        let targets = match self {
            TargetSource::List(list) => normalize(list.iter().map(String::as_str)),
            TargetSource::File(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read targets file {path:?}"))?;
                parse_targets(&content)
            }
            TargetSource::Database(sink) => sink
                .load_account_ids()
                .await
                .context("Failed to load account ids from PostgreSQL")?,
            TargetSource::Nothing => Vec::new(),
        };
        info!("Loaded {} targets", targets.len());
        Ok(targets)
    }
}

/// One target per line. Blank lines and `#` comments are skipped.
pub fn parse_targets(content: &str) -> Vec<String> {
    normalize(
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default()),
    )
}

fn normalize<'s>(items: impl Iterator<Item = &'s str>) -> Vec<String> {
    items
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
