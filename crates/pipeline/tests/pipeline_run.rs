//! Integration tests for the streaming pipeline with a scripted STT adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use phishguard_core::TranscriptFragment;
use phishguard_persistence::MemoryCallLogStore;
use phishguard_pipeline::{run_pipeline, InboundEvent, OutboundEvent};
use phishguard_scoring::{
    CategoryLexicon, DetectorConfig, KeywordLexicon, PhishingType, RiskClassifier, ScoringEngine,
    ScoringError,
};
use phishguard_session::{HybridSession, SessionConfig};
use phishguard_stt::{SttError, SttStream};

struct FixedClassifier(f32);

#[async_trait]
impl RiskClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<f32, ScoringError> {
        Ok(self.0)
    }
}

/// Scripted adapter: yields its queued results, then blocks until closed.
/// Close transitions are counted once, however many times `close` is called.
struct MockStt {
    script: tokio::sync::Mutex<VecDeque<Result<TranscriptFragment, SttError>>>,
    closed: CancellationToken,
    close_transitions: AtomicUsize,
    fed_frames: AtomicUsize,
}

impl MockStt {
    fn new(script: Vec<Result<TranscriptFragment, SttError>>) -> Arc<Self> {
        Arc::new(Self {
            script: tokio::sync::Mutex::new(script.into()),
            closed: CancellationToken::new(),
            close_transitions: AtomicUsize::new(0),
            fed_frames: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SttStream for MockStt {
    async fn feed(&self, _chunk: Bytes) -> Result<(), SttError> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.fed_frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.is_cancelled() {
            self.close_transitions.fetch_add(1, Ordering::SeqCst);
            self.closed.cancel();
        }
    }

    async fn next_transcript(&self) -> Option<Result<TranscriptFragment, SttError>> {
        let item = self.script.lock().await.pop_front();
        match item {
            Some(item) => Some(item),
            None => {
                self.closed.cancelled().await;
                None
            }
        }
    }
}

fn test_session() -> (HybridSession, Arc<MemoryCallLogStore>) {
    let keywords = KeywordLexicon::from_entries([("대출", 2.5), ("계좌번호", 3.0)]);
    let categories = CategoryLexicon::from_entries([
        ("대출", PhishingType::LoanFraud, 2.0),
        ("계좌번호", PhishingType::LoanFraud, 1.8),
    ]);
    let engine = Arc::new(ScoringEngine::new(
        keywords,
        categories,
        Arc::new(FixedClassifier(0.8)),
        DetectorConfig::default(),
    ));
    let store = Arc::new(MemoryCallLogStore::new());
    let session = HybridSession::new(engine, store.clone(), SessionConfig::default());
    (session, store)
}

async fn collect_events(mut rx: mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn kinds(events: &[OutboundEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind()).collect()
}

#[tokio::test]
async fn test_full_flow_emits_contract_events() {
    let stt = MockStt::new(vec![
        Ok(TranscriptFragment::partial("대출 상담")),
        Ok(TranscriptFragment::final_result(
            "대출 상담 도와드리겠습니다. 계좌번호 알려주세요.",
        )),
    ]);
    let (mut session, store) = test_session();
    let original_id = session.session_id().to_string();

    let (in_tx, in_rx) = mpsc::channel(8);
    let (out_tx, out_rx) = mpsc::channel(32);

    in_tx
        .send(InboundEvent::Audio(Bytes::from(vec![0u8; 640])))
        .await
        .unwrap();
    in_tx.send(InboundEvent::EndOfStream).await.unwrap();

    timeout(
        Duration::from_secs(5),
        run_pipeline(stt.clone(), &mut session, in_rx, out_tx),
    )
    .await
    .expect("pipeline must terminate");

    let events = collect_events(out_rx).await;
    assert_eq!(kinds(&events), vec!["state", "partial", "final", "risk"]);

    match &events[3] {
        OutboundEvent::Risk {
            comprehensive,
            history,
            ..
        } => {
            assert!(comprehensive.is_risk);
            assert_eq!(history.as_ref().unwrap().len(), 1);
        }
        other => panic!("expected risk event, got {}", other.kind()),
    }

    // Teardown: adapter released once, session reset with its log persisted.
    assert_eq!(stt.close_transitions.load(Ordering::SeqCst), 1);
    assert_eq!(stt.fed_frames.load(Ordering::SeqCst), 1);
    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, original_id);
    assert_ne!(session.session_id(), original_id);
}

#[tokio::test]
async fn test_backend_failure_emits_one_error_then_teardown() {
    let stt = MockStt::new(vec![
        Ok(TranscriptFragment::final_result("계좌번호 알려주세요.")),
        Err(SttError::Unavailable {
            status: "Unavailable".to_string(),
            detail: "io exception".to_string(),
        }),
    ]);
    let (mut session, store) = test_session();
    let original_id = session.session_id().to_string();

    // Transport stays up: teardown must be driven by the pump's error alone.
    let (in_tx, in_rx) = mpsc::channel(8);
    let (out_tx, out_rx) = mpsc::channel(32);

    timeout(
        Duration::from_secs(5),
        run_pipeline(stt.clone(), &mut session, in_rx, out_tx),
    )
    .await
    .expect("pipeline must terminate");
    drop(in_tx);

    let events = collect_events(out_rx).await;
    let event_kinds = kinds(&events);
    assert_eq!(
        event_kinds.iter().filter(|k| **k == "error").count(),
        1,
        "exactly one error event: {event_kinds:?}"
    );
    assert_eq!(*event_kinds.last().unwrap(), "error");

    match events.last().unwrap() {
        OutboundEvent::Error { error, detail, .. } => {
            assert_eq!(error, "stt_unavailable");
            assert!(detail.contains("io exception"));
        }
        _ => unreachable!(),
    }

    assert_eq!(stt.close_transitions.load(Ordering::SeqCst), 1);
    assert_eq!(store.records().len(), 1);
    assert_ne!(session.session_id(), original_id);
    assert_eq!(session.cumulative_score(), 0.0);
}

#[tokio::test]
async fn test_whitespace_transcripts_are_skipped() {
    let stt = MockStt::new(vec![
        Ok(TranscriptFragment::partial("   ")),
        Ok(TranscriptFragment::final_result("계좌번호 알려주세요.")),
    ]);
    let (mut session, _) = test_session();

    let (in_tx, in_rx) = mpsc::channel(8);
    let (out_tx, out_rx) = mpsc::channel(32);
    in_tx.send(InboundEvent::EndOfStream).await.unwrap();

    timeout(
        Duration::from_secs(5),
        run_pipeline(stt, &mut session, in_rx, out_tx),
    )
    .await
    .unwrap();

    let events = collect_events(out_rx).await;
    // No event for the whitespace-only chunk.
    assert_eq!(kinds(&events), vec!["state", "final", "risk"]);
}

#[tokio::test]
async fn test_disconnect_without_final_persists_nothing() {
    let stt = MockStt::new(vec![Ok(TranscriptFragment::partial("잠깐만요"))]);
    let (mut session, store) = test_session();
    let original_id = session.session_id().to_string();

    let (in_tx, in_rx) = mpsc::channel(8);
    let (out_tx, out_rx) = mpsc::channel(32);

    in_tx
        .send(InboundEvent::Audio(Bytes::from(vec![0u8; 320])))
        .await
        .unwrap();
    in_tx.send(InboundEvent::Disconnected).await.unwrap();

    timeout(
        Duration::from_secs(5),
        run_pipeline(stt.clone(), &mut session, in_rx, out_tx),
    )
    .await
    .unwrap();

    let events = collect_events(out_rx).await;
    assert_eq!(kinds(&events), vec!["state", "partial"]);

    // Nothing finalized, so nothing persisted; the session still rotates.
    assert_eq!(stt.close_transitions.load(Ordering::SeqCst), 1);
    assert!(store.records().is_empty());
    assert_ne!(session.session_id(), original_id);
}
