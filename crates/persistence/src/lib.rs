//! Call-log persistence for phishguard
//!
//! One record per session, written by the session's `reset()` at teardown.
//! The sink is append-only; nothing in the detection path reads it back.

pub mod store;

pub use store::{CallLogEntry, CallLogStore, CallRecord, JsonlCallLogStore, MemoryCallLogStore};

use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
