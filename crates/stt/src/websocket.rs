//! Message-based WebSocket STT backend

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitStream, StreamExt};
use futures::SinkExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use phishguard_core::TranscriptFragment;

use crate::{SttError, SttStream, AUDIO_QUEUE_DEPTH};

/// Provider result frame: `{"text": "...", "type": "partial" | "final"}`.
#[derive(Debug, Deserialize)]
struct ProviderResult {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "type")]
    kind: String,
}

/// WebSocket connection to a socket-based STT provider.
///
/// Fed audio goes through a bounded queue to a dedicated sender task;
/// results are read off the receive half by `next_transcript`.
pub struct WebSocketSttStream {
    audio_tx: mpsc::Sender<Bytes>,
    closed: CancellationToken,
    reader: tokio::sync::Mutex<SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>>,
}

impl WebSocketSttStream {
    /// Connect to the provider, passing the sample rate as a query param.
    pub async fn connect(url: &str, sample_rate: u32) -> Result<Self, SttError> {
        let full_url = format!("{url}?sr={sample_rate}");
        let (ws, _) = connect_async(&full_url)
            .await
            .map_err(|e| SttError::Unavailable {
                status: "Unavailable".to_string(),
                detail: format!("websocket connect failed: {e}"),
            })?;

        let (mut writer, reader) = ws.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_QUEUE_DEPTH);
        let closed = CancellationToken::new();

        let token = closed.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    chunk = audio_rx.recv() => match chunk {
                        Some(chunk) => {
                            if let Err(e) = writer.send(Message::Binary(chunk.to_vec())).await {
                                tracing::debug!("STT websocket send failed: {}", e);
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            let _ = writer.send(Message::Close(None)).await;
        });

        Ok(Self {
            audio_tx,
            closed,
            reader: tokio::sync::Mutex::new(reader),
        })
    }
}

#[async_trait]
impl SttStream for WebSocketSttStream {
    async fn feed(&self, chunk: Bytes) -> Result<(), SttError> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        if self.audio_tx.send(chunk).await.is_err() {
            // Sender task ended (connection gone); closed-adapter semantics.
            tracing::debug!("Dropping audio chunk, STT websocket sender has ended");
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.cancel();
    }

    async fn next_transcript(&self) -> Option<Result<TranscriptFragment, SttError>> {
        let mut reader = self.reader.lock().await;
        loop {
            tokio::select! {
                // Prefer draining received frames over observing close.
                biased;
                msg = reader.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ProviderResult>(&text) {
                            Ok(result) if !result.text.is_empty() => {
                                return Some(Ok(TranscriptFragment::new(
                                    result.text,
                                    result.kind == "final",
                                )));
                            }
                            Ok(_) => continue,
                            Err(e) => {
                                return Some(Err(SttError::Protocol(format!(
                                    "unparseable provider frame: {e}"
                                ))));
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return Some(Err(SttError::Unavailable {
                            status: "Unavailable".to_string(),
                            detail: e.to_string(),
                        }));
                    }
                },
                _ = self.closed.cancelled() => return None,
            }
        }
    }
}
