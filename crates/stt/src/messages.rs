//! gRPC message types for the streaming recognizer
//!
//! Manually defined protobuf-compatible types; the backend exposes a plain
//! bidirectional `StreamingRecognize` method, so hand-written prost structs
//! keep the build free of a codegen step.

use prost::Message;

/// Stream-opening configuration, sent once as the first request.
#[derive(Clone, PartialEq, Message)]
pub struct RecognitionConfig {
    /// Audio sample rate in Hz
    #[prost(int32, tag = "1")]
    pub sample_rate: i32,

    /// BCP-47 language tag (e.g. "ko-KR")
    #[prost(string, tag = "2")]
    pub language: String,
}

/// One request on the outbound stream: the first carries the config, all
/// subsequent ones carry raw audio.
#[derive(Clone, PartialEq, Message)]
pub struct StreamingRecognizeRequest {
    #[prost(message, optional, tag = "1")]
    pub config: Option<RecognitionConfig>,

    /// PCM16LE audio bytes
    #[prost(bytes = "vec", tag = "2")]
    pub audio_content: Vec<u8>,
}

/// One recognition result on the inbound stream.
#[derive(Clone, PartialEq, Message)]
pub struct StreamingRecognizeResponse {
    /// Transcript text for the current utterance
    #[prost(string, tag = "1")]
    pub transcript: String,

    /// Whether the backend locked this result in
    #[prost(bool, tag = "2")]
    pub is_final: bool,
}
