//! Bidirectional-streaming gRPC STT backend

use async_trait::async_trait;
use bytes::Bytes;
use http::uri::PathAndQuery;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tonic::{Request, Status, Streaming};

use phishguard_core::TranscriptFragment;

use crate::messages::{RecognitionConfig, StreamingRecognizeRequest, StreamingRecognizeResponse};
use crate::{SttError, SttStream, AUDIO_QUEUE_DEPTH};

const STREAMING_RECOGNIZE_PATH: &str = "/phishguard.stt.v1.Recognizer/StreamingRecognize";

/// Streaming RPC connection to the recognizer backend.
///
/// Audio fed from one task is queued onto the request stream while responses
/// are read from another; tonic drives both directions of the channel
/// concurrently. Dropping the request sender half-closes the stream, which a
/// well-behaved backend answers by finishing the response stream.
pub struct GrpcSttStream {
    audio_tx: parking_lot::Mutex<Option<mpsc::Sender<StreamingRecognizeRequest>>>,
    closed: CancellationToken,
    responses: tokio::sync::Mutex<Streaming<StreamingRecognizeResponse>>,
}

impl GrpcSttStream {
    /// Connect and open the bidirectional stream, sending the configuration
    /// message first.
    pub async fn connect(
        endpoint: &str,
        sample_rate: u32,
        language: &str,
    ) -> Result<Self, SttError> {
        let channel = Channel::from_shared(endpoint.to_string())
            .map_err(|e| SttError::Connection(format!("invalid endpoint {endpoint:?}: {e}")))?
            .connect()
            .await
            .map_err(|e| SttError::Unavailable {
                status: "Unavailable".to_string(),
                detail: e.to_string(),
            })?;

        let (audio_tx, audio_rx) = mpsc::channel::<StreamingRecognizeRequest>(AUDIO_QUEUE_DEPTH);

        let config = StreamingRecognizeRequest {
            config: Some(RecognitionConfig {
                sample_rate: sample_rate as i32,
                language: language.to_string(),
            }),
            audio_content: Vec::new(),
        };
        audio_tx
            .try_send(config)
            .map_err(|e| SttError::Connection(format!("failed to queue config frame: {e}")))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await.map_err(|e| SttError::Unavailable {
            status: "Unavailable".to_string(),
            detail: e.to_string(),
        })?;

        let codec: ProstCodec<StreamingRecognizeRequest, StreamingRecognizeResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static(STREAMING_RECOGNIZE_PATH);
        let responses = grpc
            .streaming(Request::new(ReceiverStream::new(audio_rx)), path, codec)
            .await
            .map_err(status_to_error)?
            .into_inner();

        Ok(Self {
            audio_tx: parking_lot::Mutex::new(Some(audio_tx)),
            closed: CancellationToken::new(),
            responses: tokio::sync::Mutex::new(responses),
        })
    }
}

#[async_trait]
impl SttStream for GrpcSttStream {
    async fn feed(&self, chunk: Bytes) -> Result<(), SttError> {
        if self.closed.is_cancelled() {
            return Ok(());
        }

        let tx = self.audio_tx.lock().clone();
        let Some(tx) = tx else {
            return Ok(());
        };

        let request = StreamingRecognizeRequest {
            config: None,
            audio_content: chunk.to_vec(),
        };
        if tx.send(request).await.is_err() {
            // Request stream already torn down; treated like a closed adapter.
            tracing::debug!("Dropping audio chunk, gRPC request stream has ended");
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.cancel();
        // Half-close the request stream so the backend can finish draining.
        self.audio_tx.lock().take();
    }

    async fn next_transcript(&self) -> Option<Result<TranscriptFragment, SttError>> {
        let mut responses = self.responses.lock().await;
        loop {
            tokio::select! {
                // Prefer draining buffered responses over observing close.
                biased;
                msg = responses.message() => match msg {
                    Ok(Some(response)) => {
                        if response.transcript.is_empty() {
                            continue;
                        }
                        return Some(Ok(TranscriptFragment::new(
                            response.transcript,
                            response.is_final,
                        )));
                    }
                    Ok(None) => return None,
                    Err(status) => return Some(Err(status_to_error(status))),
                },
                _ = self.closed.cancelled() => return None,
            }
        }
    }
}

fn status_to_error(status: Status) -> SttError {
    SttError::Unavailable {
        status: format!("{:?}", status.code()),
        detail: status.message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_maps_to_unavailable() {
        // Nothing listens on this port.
        let result = GrpcSttStream::connect("http://127.0.0.1:1", 16000, "ko-KR").await;
        match result {
            Err(SttError::Unavailable { .. }) => {}
            other => panic!("expected Unavailable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_status_mapping_carries_code_and_detail() {
        let status = Status::unavailable("backend down");
        let err = status_to_error(status);
        match err {
            SttError::Unavailable { status, detail } => {
                assert_eq!(status, "Unavailable");
                assert_eq!(detail, "backend down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
