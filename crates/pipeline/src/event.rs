//! Pipeline event types
//!
//! `OutboundEvent` is the transport-agnostic JSON contract: one object per
//! emission, discriminated by `kind`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use phishguard_persistence::CallLogEntry;
use phishguard_scoring::{ComprehensiveResult, ImmediateResult};

/// Inbound transport events consumed by the Receiver task.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// One binary audio frame (PCM16LE)
    Audio(Bytes),

    /// The client signalled end of input (`"__END__"` control frame)
    EndOfStream,

    /// The transport disconnected
    Disconnected,
}

/// Outbound events emitted to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Emitted once at pipeline start
    State { text: String, t: f64 },

    /// A non-final transcript chunk was processed
    Partial {
        text: String,
        /// Cumulative session snapshot
        immediate: ImmediateResult,
        /// Immediate analysis of this chunk alone
        #[serde(skip_serializing_if = "Option::is_none")]
        chunk_immediate: Option<ImmediateResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        history: Option<Vec<CallLogEntry>>,
        t: f64,
    },

    /// A final transcript chunk was processed
    Final {
        text: String,
        immediate: ImmediateResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        chunk_immediate: Option<ImmediateResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        history: Option<Vec<CallLogEntry>>,
        t: f64,
    },

    /// A finalization boundary produced a comprehensive result
    Risk {
        text: String,
        immediate: ImmediateResult,
        comprehensive: ComprehensiveResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        history: Option<Vec<CallLogEntry>>,
        t: f64,
    },

    /// Backend or internal failure; the stream ends after this
    Error {
        error: String,
        detail: String,
        t: f64,
    },
}

impl OutboundEvent {
    /// The `kind` discriminant, for logging and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::State { .. } => "state",
            OutboundEvent::Partial { .. } => "partial",
            OutboundEvent::Final { .. } => "final",
            OutboundEvent::Risk { .. } => "risk",
            OutboundEvent::Error { .. } => "error",
        }
    }
}
