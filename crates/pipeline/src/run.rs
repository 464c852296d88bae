//! Pipeline execution

use std::sync::Arc;

use tokio::sync::mpsc;

use phishguard_core::{epoch_secs, pcm16_volume};
use phishguard_session::HybridSession;
use phishguard_stt::{SttError, SttStream};

use crate::event::{InboundEvent, OutboundEvent};

/// Run one detection pipeline to completion.
///
/// Returns when the transcript stream ends, the transport goes away, or the
/// backend fails. Teardown always runs: the adapter is closed (idempotent),
/// the session is reset (flushing its conversation log to the sink), and the
/// Receiver task is cancelled, in that order.
pub async fn run_pipeline(
    stt: Arc<dyn SttStream>,
    session: &mut HybridSession,
    inbound: mpsc::Receiver<InboundEvent>,
    outbound: mpsc::Sender<OutboundEvent>,
) {
    let session_id = session.session_id().to_string();
    tracing::info!(session_id = %session_id, "Pipeline started");

    let _ = outbound
        .send(OutboundEvent::State {
            text: "ready".to_string(),
            t: epoch_secs(),
        })
        .await;

    let receiver = tokio::spawn(receive_audio(inbound, stt.clone()));

    pump(stt.clone(), session, &outbound).await;

    // Teardown order is load-bearing: closing the adapter unblocks anything
    // still awaiting transcripts before the session state is torn down.
    stt.close().await;
    session.reset().await;
    receiver.abort();

    tracing::info!(session_id = %session_id, "Pipeline closed");
}

/// Receiver task: forward inbound audio to the adapter until the input ends.
///
/// Both the end-of-stream control frame and a disconnect close the adapter;
/// a second disconnect notification lands after the loop has exited and is
/// simply dropped with the channel.
async fn receive_audio(mut inbound: mpsc::Receiver<InboundEvent>, stt: Arc<dyn SttStream>) {
    while let Some(event) = inbound.recv().await {
        match event {
            InboundEvent::Audio(bytes) => {
                let volume = pcm16_volume(&bytes);
                tracing::debug!(len = bytes.len(), volume, "Audio frame received");
                if let Err(e) = stt.feed(bytes).await {
                    tracing::warn!("STT feed failed: {}", e);
                    break;
                }
            }
            InboundEvent::EndOfStream => {
                tracing::info!("End-of-stream control received");
                stt.close().await;
                break;
            }
            InboundEvent::Disconnected => {
                tracing::info!("Transport disconnected");
                stt.close().await;
                break;
            }
        }
    }
    // Input channel gone without a control frame: same as a disconnect.
    stt.close().await;
}

/// Pump task: drain transcripts through the session and emit events.
async fn pump(
    stt: Arc<dyn SttStream>,
    session: &mut HybridSession,
    outbound: &mpsc::Sender<OutboundEvent>,
) {
    while let Some(item) = stt.next_transcript().await {
        match item {
            Ok(fragment) => {
                let text = fragment.trimmed().to_string();
                if text.is_empty() {
                    continue;
                }

                tracing::debug!(final_hint = fragment.is_final, text = %text, "Transcript chunk");
                let outcome = session.process_fragment(&text, fragment.is_final).await;

                let history = if outcome.finalized {
                    Some(outcome.history.clone())
                } else {
                    None
                };

                let event = if fragment.is_final {
                    OutboundEvent::Final {
                        text: text.clone(),
                        immediate: outcome.immediate.clone(),
                        chunk_immediate: Some(outcome.chunk_immediate),
                        history: history.clone(),
                        t: epoch_secs(),
                    }
                } else {
                    OutboundEvent::Partial {
                        text: text.clone(),
                        immediate: outcome.immediate.clone(),
                        chunk_immediate: Some(outcome.chunk_immediate),
                        history: history.clone(),
                        t: epoch_secs(),
                    }
                };
                if outbound.send(event).await.is_err() {
                    tracing::debug!("Outbound channel closed, ending pump");
                    break;
                }

                if let Some(comprehensive) = outcome.comprehensive {
                    let risk = OutboundEvent::Risk {
                        text,
                        immediate: outcome.immediate,
                        comprehensive,
                        history: Some(outcome.history),
                        t: epoch_secs(),
                    };
                    if outbound.send(risk).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::error!("STT stream failed: {}", e);
                // Best-effort: the transport may already be gone.
                let _ = outbound.send(error_event(&e)).await;
                break;
            }
        }
    }
}

fn error_event(e: &SttError) -> OutboundEvent {
    let code = match e {
        SttError::Unavailable { .. } => "stt_unavailable",
        SttError::Connection(_) => "stt_connection",
        SttError::Protocol(_) => "stt_protocol",
    };
    OutboundEvent::Error {
        error: code.to_string(),
        detail: e.to_string(),
        t: epoch_secs(),
    }
}
