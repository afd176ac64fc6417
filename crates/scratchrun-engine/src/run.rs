use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use scratchrun_utils::types::{ScratchFile, Stage};

use crate::stages::StageOutcome;

const RUN_ID_LEN: usize = 12;

/// Identity of one run, handed to every listener call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScratchRun {
    pub id: String,
    pub file_name: String,
    /// BLAKE3 of the snippet text
    pub source_hash: String,
    pub started_at: DateTime<Utc>,
}

impl ScratchRun {
    #[must_use]
    pub fn new(file: &ScratchFile) -> Self {
        Self::started_at(file, Utc::now())
    }

    #[must_use]
    pub fn started_at(file: &ScratchFile, started_at: DateTime<Utc>) -> Self {
        let source_hash = blake3::hash(file.text().as_bytes()).to_hex().to_string();

        let mut hasher = blake3::Hasher::new();
        hasher.update(file.name().as_bytes());
        hasher.update(&[0]);
        hasher.update(file.text().as_bytes());
        hasher.update(&[0]);
        hasher.update(started_at.to_rfc3339().as_bytes());
        let mut id = hasher.finalize().to_hex().to_string();
        id.truncate(RUN_ID_LEN);

        Self {
            id,
            file_name: file.name().to_string(),
            source_hash,
            started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed { stage: Stage, message: String },
}

/// Returned by `ScratchExecutor::execute` after FINISH.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run: ScratchRun,
    #[serde(flatten)]
    pub status: RunStatus,
    pub events_emitted: usize,
    pub duration_ms: u64,
    #[serde(skip)]
    pub outcome: Option<StageOutcome>,
}

impl RunSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
