//! WebSocket Handler
//!
//! Bridges one client socket to one pipeline run: binary frames and the
//! `"__END__"` control frame flow in, the typed event contract flows out.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use phishguard_core::epoch_secs;
use phishguard_pipeline::{run_pipeline, InboundEvent, OutboundEvent};
use phishguard_stt::connect_stream;

use crate::state::AppState;

/// Query parameters for the transcription stream
#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    /// Audio sample rate
    #[serde(default = "default_sr")]
    pub sr: u32,

    /// Recognition language
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Client tag ("web", "android", ...) for log correlation
    #[serde(default = "default_client")]
    pub client: String,
}

fn default_sr() -> u32 {
    16000
}
fn default_lang() -> String {
    "ko-KR".to_string()
}
fn default_client() -> String {
    "unknown".to_string()
}

/// Handle WebSocket upgrade for `/api/transcribe/ws`
pub async fn transcribe_ws(
    ws: WebSocketUpgrade,
    Query(params): Query<TranscribeParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: AppState, params: TranscribeParams) {
    tracing::info!(
        client = %params.client,
        sr = params.sr,
        lang = %params.lang,
        "Transcribe websocket open"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    let stt_config = state.stt_config(params.sr, &params.lang);
    let stt = match connect_stream(&stt_config).await {
        Ok(stt) => stt,
        Err(e) => {
            tracing::error!(client = %params.client, "STT connect failed: {}", e);
            let event = OutboundEvent::Error {
                error: "stt_unavailable".to_string(),
                detail: e.to_string(),
                t: epoch_secs(),
            };
            if let Ok(json) = serde_json::to_string(&event) {
                let _ = ws_tx.send(Message::Text(json)).await;
            }
            let _ = ws_tx.close().await;
            return;
        }
    };

    let mut session = state.new_session();

    let (in_tx, in_rx) = mpsc::channel::<InboundEvent>(64);
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(64);

    // Transport → pipeline. A disconnect seen here is normal teardown, not
    // an error; the pipeline absorbs it silently.
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Binary(data)) => {
                    if in_tx.send(InboundEvent::Audio(Bytes::from(data))).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Text(text)) => {
                    if text == "__END__" {
                        let _ = in_tx.send(InboundEvent::EndOfStream).await;
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    let _ = in_tx.send(InboundEvent::Disconnected).await;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Websocket receive error: {}", e);
                    let _ = in_tx.send(InboundEvent::Disconnected).await;
                    break;
                }
            }
        }
    });

    // Pipeline → transport. Ends when the pipeline drops its sender.
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    tracing::debug!(kind = event.kind(), "Event to client");
                    if ws_tx.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to serialize outbound event: {}", e),
            }
        }
        let _ = ws_tx.close().await;
    });

    run_pipeline(stt, &mut session, in_rx, out_tx).await;

    let _ = writer.await;
    reader.abort();

    tracing::info!(client = %params.client, "Transcribe websocket closed");
}
