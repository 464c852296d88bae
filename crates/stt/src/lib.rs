//! Streaming speech-to-text adapters
//!
//! An [`SttStream`] is a live connection to a transcription backend, owned
//! by exactly one session's pipeline for its lifetime. Two interchangeable
//! implementations:
//! - [`GrpcSttStream`]: bidirectional-streaming RPC backend
//! - [`WebSocketSttStream`]: message-based socket backend
//!
//! Both queue fed audio internally so `feed` never blocks beyond a bounded
//! enqueue, and both drive the backend's send and receive directions from
//! separate tasks.

pub mod grpc;
mod messages;
pub mod websocket;

pub use grpc::GrpcSttStream;
pub use messages::{RecognitionConfig, StreamingRecognizeRequest, StreamingRecognizeResponse};
pub use websocket::WebSocketSttStream;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use phishguard_core::TranscriptFragment;

/// Depth of the internal audio queue. Bounded so a slow backend applies
/// backpressure to the audio producer instead of buffering without limit.
pub(crate) const AUDIO_QUEUE_DEPTH: usize = 32;

/// STT adapter errors
#[derive(Error, Debug)]
pub enum SttError {
    /// Backend unavailability or protocol failure, carrying the
    /// backend-specific status code and detail.
    #[error("STT backend unavailable ({status}): {detail}")]
    Unavailable { status: String, detail: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// A live streaming connection to an STT backend.
///
/// `next_transcript` yields the backend's `(text, final)` results one at a
/// time and returns `None` once the stream has ended; it is meant for a
/// single consumer. A stream is not restartable in place; reconnect by
/// constructing a new adapter.
#[async_trait]
pub trait SttStream: Send + Sync {
    /// Enqueue one block of audio for transmission. Suspends only while the
    /// bounded internal queue is full. A no-op (not an error) after `close`.
    async fn feed(&self, chunk: Bytes) -> Result<(), SttError>;

    /// Signal end-of-input and release the backend connection. Idempotent,
    /// and safe to call from both completion and error/cancellation paths.
    /// Unblocks any task awaiting `next_transcript`.
    async fn close(&self);

    /// Next transcript result, or `None` when the stream has ended.
    async fn next_transcript(&self) -> Option<Result<TranscriptFragment, SttError>>;
}

/// STT backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    Grpc,
    WebSocket,
}

impl SttProvider {
    /// Parse the configuration selector (`"grpc"` or `"ws"`).
    pub fn parse(value: &str) -> Result<Self, SttError> {
        match value {
            "grpc" => Ok(SttProvider::Grpc),
            "ws" => Ok(SttProvider::WebSocket),
            other => Err(SttError::Protocol(format!(
                "unknown STT provider: {other:?} (expected \"grpc\" or \"ws\")"
            ))),
        }
    }
}

/// Runtime connection settings for the factory.
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub grpc_endpoint: String,
    pub ws_url: String,
    pub sample_rate: u32,
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: SttProvider::Grpc,
            grpc_endpoint: "http://127.0.0.1:50051".to_string(),
            ws_url: "wss://stt.example.com/stream".to_string(),
            sample_rate: 16000,
            language: "ko-KR".to_string(),
        }
    }
}

/// Connect a new adapter for the configured provider.
pub async fn connect_stream(config: &SttConfig) -> Result<Arc<dyn SttStream>, SttError> {
    match config.provider {
        SttProvider::Grpc => {
            tracing::info!(endpoint = %config.grpc_endpoint, "Connecting gRPC STT stream");
            let stream = GrpcSttStream::connect(
                &config.grpc_endpoint,
                config.sample_rate,
                &config.language,
            )
            .await?;
            Ok(Arc::new(stream))
        }
        SttProvider::WebSocket => {
            tracing::info!(url = %config.ws_url, "Connecting WebSocket STT stream");
            let stream = WebSocketSttStream::connect(&config.ws_url, config.sample_rate).await?;
            Ok(Arc::new(stream))
        }
    }
}
