//! Call-record store implementations

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use phishguard_scoring::{ComprehensiveResult, ImmediateResult};

use crate::PersistenceError;

/// One finalized fragment as recorded in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLogEntry {
    /// The finalized sentence
    pub text: String,

    /// When the sentence was finalized
    pub timestamp: DateTime<Utc>,

    /// Immediate analysis of the finalized sentence itself
    pub chunk_immediate: ImmediateResult,

    /// Cumulative session snapshot at the time of finalization
    pub immediate: ImmediateResult,

    /// Comprehensive result computed at this boundary, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comprehensive: Option<ComprehensiveResult>,
}

/// One record per session, keyed by session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub log: Vec<CallLogEntry>,
}

/// Append-only sink for finished call records.
#[async_trait]
pub trait CallLogStore: Send + Sync {
    async fn persist(&self, record: &CallRecord) -> Result<(), PersistenceError>;
}

/// JSONL file sink: one record per line, appended at session teardown.
pub struct JsonlCallLogStore {
    path: PathBuf,
}

impl JsonlCallLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CallLogStore for JsonlCallLogStore {
    async fn persist(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(
            session_id = %record.session_id,
            entries = record.log.len(),
            "Call record persisted"
        );
        Ok(())
    }
}

/// In-memory sink for tests and development.
#[derive(Default)]
pub struct MemoryCallLogStore {
    records: parking_lot::Mutex<Vec<CallRecord>>,
}

impl MemoryCallLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far.
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl CallLogStore for MemoryCallLogStore {
    async fn persist(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
