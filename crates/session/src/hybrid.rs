//! The hybrid detection session state machine

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use phishguard_persistence::{CallLogEntry, CallLogStore, CallRecord};
use phishguard_scoring::{
    level_for_score, ComprehensiveResult, ImmediateResult, KeywordDetail, PhishingType,
    ScoringEngine,
};

use crate::SessionConfig;

/// Sentence-final punctuation accepted by the forced-finalization heuristic.
const TERMINAL_PUNCT: [char; 4] = ['.', '?', '!', '…'];

/// Sentence-final particle suffixes accepted by the forced-finalization
/// heuristic.
const TERMINAL_SUFFIXES: [&str; 6] = ["습니다", "니다", "세요", "지요", "에요", "죠"];

/// Result of one `process_fragment` call.
#[derive(Debug, Clone)]
pub struct FragmentOutcome {
    /// Session id the outcome belongs to
    pub session_id: String,

    /// Immediate analysis of this chunk alone
    pub chunk_immediate: ImmediateResult,

    /// Cumulative session snapshot after applying the chunk
    pub immediate: ImmediateResult,

    /// Comprehensive result, present only when this call crossed a
    /// finalization boundary and the analysis gate was satisfied
    pub comprehensive: Option<ComprehensiveResult>,

    /// Conversation log snapshot
    pub history: Vec<CallLogEntry>,

    /// Did this fragment finalize a sentence?
    pub finalized: bool,
}

/// Result of one `add_sentence` call.
#[derive(Debug, Clone)]
pub struct SentenceOutcome {
    /// Immediate analysis of the sentence
    pub immediate: ImmediateResult,

    /// Comprehensive result, if the analysis gate was satisfied
    pub comprehensive: Option<ComprehensiveResult>,
}

/// Per-call mutable detection state.
///
/// Behaviorally three states: idle (fresh or reset), accumulating (pending
/// text buffered), and transiently finalizing while a sentence is committed.
pub struct HybridSession {
    session_id: String,
    config: SessionConfig,
    engine: Arc<ScoringEngine>,
    log_store: Arc<dyn CallLogStore>,
    started_at: DateTime<Utc>,

    /// Recent finalized sentences, bounded by `window_size`
    fragment_buffer: VecDeque<String>,

    /// Not-yet-finalized tail of the current utterance
    pending_text: String,

    /// All finalized sentences so far, input to the comprehensive classifier
    accumulated_text: String,

    /// Running risk estimate in [0, 100]
    cumulative_score: f32,

    /// Per-keyword occurrence counts, for repeat dampening and
    /// call-level category dominance
    keyword_counts: HashMap<String, u32>,

    /// Deduplicated keywords in order of first occurrence
    cumulative_keywords: Vec<String>,

    /// Details for keywords already reported
    cumulative_details: Vec<KeywordDetail>,
    detail_words_seen: HashSet<String>,

    /// Last-observed phishing sub-category
    dominant_type: Option<PhishingType>,

    /// Finalized-fragment records, flushed to the log store on reset
    conversation_log: Vec<CallLogEntry>,

    /// Finalized sentences processed this session
    sentence_count: usize,

    /// Most recent comprehensive result
    latest_comprehensive: Option<ComprehensiveResult>,
}

impl HybridSession {
    pub fn new(
        engine: Arc<ScoringEngine>,
        log_store: Arc<dyn CallLogStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            config,
            engine,
            log_store,
            started_at: Utc::now(),
            fragment_buffer: VecDeque::new(),
            pending_text: String::new(),
            accumulated_text: String::new(),
            cumulative_score: 0.0,
            keyword_counts: HashMap::new(),
            cumulative_keywords: Vec::new(),
            cumulative_details: Vec::new(),
            detail_words_seen: HashSet::new(),
            dominant_type: None,
            conversation_log: Vec::new(),
            sentence_count: 0,
            latest_comprehensive: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cumulative_score(&self) -> f32 {
        self.cumulative_score
    }

    pub fn sentence_count(&self) -> usize {
        self.sentence_count
    }

    pub fn conversation_log(&self) -> &[CallLogEntry] {
        &self.conversation_log
    }

    pub fn latest_comprehensive(&self) -> Option<&ComprehensiveResult> {
        self.latest_comprehensive.as_ref()
    }

    /// Process one transcript chunk from the STT stream.
    ///
    /// Empty or whitespace-only input is a valid no-op: the current
    /// cumulative snapshot is returned and no state changes.
    pub async fn process_fragment(&mut self, piece: &str, is_final_hint: bool) -> FragmentOutcome {
        if piece.trim().is_empty() {
            return FragmentOutcome {
                session_id: self.session_id.clone(),
                chunk_immediate: ImmediateResult::zero(),
                immediate: self.cumulative_snapshot(),
                comprehensive: None,
                history: self.conversation_log.clone(),
                finalized: false,
            };
        }

        let chunk_immediate = self.engine.detect_immediate(piece, &self.keyword_counts);
        self.apply_chunk_score(&chunk_immediate);

        if !self.pending_text.is_empty() {
            self.pending_text.push(' ');
        }
        self.pending_text.push_str(piece.trim());

        let finalize = is_final_hint
            || (self.config.force_finalize && self.should_force_finalize(&self.pending_text));

        let mut comprehensive = None;
        if finalize {
            let sentence = std::mem::take(&mut self.pending_text);
            comprehensive = self.finalize_sentence(sentence.trim()).await.1;
        }

        FragmentOutcome {
            session_id: self.session_id.clone(),
            chunk_immediate,
            immediate: self.cumulative_snapshot(),
            comprehensive,
            history: self.conversation_log.clone(),
            finalized: finalize,
        }
    }

    /// Commit an already-finalized sentence directly, bypassing fragment
    /// buffering. Used internally at finalization and exposed for
    /// non-fragmented input.
    pub async fn add_sentence(&mut self, sentence: &str) -> SentenceOutcome {
        if sentence.trim().is_empty() {
            return SentenceOutcome {
                immediate: ImmediateResult::zero(),
                comprehensive: None,
            };
        }

        let (immediate, comprehensive) = self.finalize_sentence(sentence.trim()).await;
        SentenceOutcome {
            immediate,
            comprehensive,
        }
    }

    /// Persist the conversation log and clear all mutable state.
    ///
    /// Must be called once per teardown; calling it again is a no-op beyond
    /// minting a fresh session id. Persistence failures are logged and
    /// swallowed: teardown must always complete.
    pub async fn reset(&mut self) {
        if !self.conversation_log.is_empty() {
            let record = CallRecord {
                session_id: self.session_id.clone(),
                started_at: self.started_at,
                ended_at: Utc::now(),
                log: std::mem::take(&mut self.conversation_log),
            };
            if let Err(e) = self.log_store.persist(&record).await {
                tracing::warn!(
                    session_id = %record.session_id,
                    "Failed to persist call record: {}", e
                );
            }
        }

        self.fragment_buffer.clear();
        self.pending_text.clear();
        self.accumulated_text.clear();
        self.cumulative_score = 0.0;
        self.keyword_counts.clear();
        self.cumulative_keywords.clear();
        self.cumulative_details.clear();
        self.detail_words_seen.clear();
        self.dominant_type = None;
        self.conversation_log.clear();
        self.sentence_count = 0;
        self.latest_comprehensive = None;
        self.started_at = Utc::now();
        self.session_id = uuid::Uuid::new_v4().to_string();
    }

    /// Cumulative state expressed as an immediate-result snapshot.
    pub fn cumulative_snapshot(&self) -> ImmediateResult {
        ImmediateResult {
            level: level_for_score(self.cumulative_score),
            probability: self.cumulative_score,
            phishing_type: self.dominant_type,
            keywords: self.cumulative_keywords.clone(),
            keyword_details: self.cumulative_details.clone(),
        }
    }

    /// Grow the cumulative score on a risky chunk, decay it on a safe one.
    fn apply_chunk_score(&mut self, chunk: &ImmediateResult) {
        if chunk.is_risky() {
            // Repeating the same trigger word inflates the raw score; damp
            // each keyword's contribution by how often it was already heard.
            let repeat_factor = if chunk.keywords.is_empty() {
                1.0
            } else {
                let sum: f32 = chunk
                    .keywords
                    .iter()
                    .map(|kw| {
                        let prior = self.keyword_counts.get(kw).copied().unwrap_or(0);
                        1.0 / (1.0 + prior as f32)
                    })
                    .sum();
                sum / chunk.keywords.len() as f32
            };

            let delta = chunk.probability * self.config.risk_gain * repeat_factor;
            self.cumulative_score = (self.cumulative_score + delta).min(100.0);

            for kw in &chunk.keywords {
                *self.keyword_counts.entry(kw.clone()).or_insert(0) += 1;
                if self.detail_words_seen.insert(kw.clone()) {
                    self.cumulative_keywords.push(kw.clone());
                }
            }
            for detail in &chunk.keyword_details {
                if !self
                    .cumulative_details
                    .iter()
                    .any(|d| d.word == detail.word)
                {
                    self.cumulative_details.push(detail.clone());
                }
            }
            if chunk.phishing_type.is_some() {
                self.dominant_type = chunk.phishing_type;
            }
        } else {
            self.cumulative_score = (self.cumulative_score - self.config.safe_decay).max(0.0);
        }
    }

    /// Commit a finalized sentence: window buffer, accumulated text, log,
    /// and the gated comprehensive analysis.
    async fn finalize_sentence(
        &mut self,
        sentence: &str,
    ) -> (ImmediateResult, Option<ComprehensiveResult>) {
        self.fragment_buffer.push_back(sentence.to_string());
        while self.fragment_buffer.len() > self.config.window_size {
            self.fragment_buffer.pop_front();
        }

        if !self.accumulated_text.is_empty() {
            self.accumulated_text.push(' ');
        }
        self.accumulated_text.push_str(sentence);
        self.sentence_count += 1;

        // Re-scored on the whole finalized sentence for log fidelity; the
        // per-chunk results may have covered it in several pieces.
        let immediate = self
            .engine
            .detect_immediate(sentence, &self.keyword_counts);

        let comprehensive = if self.comprehensive_gate_open() {
            let result = self
                .engine
                .detect_comprehensive(&self.accumulated_text)
                .await;
            self.latest_comprehensive = Some(result.clone());
            Some(result)
        } else {
            None
        };

        self.conversation_log.push(CallLogEntry {
            text: sentence.to_string(),
            timestamp: Utc::now(),
            chunk_immediate: immediate.clone(),
            immediate: self.cumulative_snapshot(),
            comprehensive: comprehensive.clone(),
        });

        (immediate, comprehensive)
    }

    fn comprehensive_gate_open(&self) -> bool {
        self.sentence_count >= self.config.min_sentences_comprehensive
            || self.accumulated_text.trim().chars().count() >= self.config.min_chars_comprehensive
    }

    /// Forced finalization: some transcribers never emit a reliable final
    /// flag, so longer pending text that looks sentence-shaped is committed
    /// anyway. Short fragments never force-finalize.
    fn should_force_finalize(&self, pending: &str) -> bool {
        let trimmed = pending.trim();
        if trimmed.chars().count() < self.config.min_chars_force_final {
            return false;
        }

        let last_char = trimmed.chars().next_back();
        if last_char.is_some_and(|c| TERMINAL_PUNCT.contains(&c)) {
            return true;
        }
        if TERMINAL_SUFFIXES.iter().any(|s| trimmed.ends_with(s)) {
            return true;
        }

        // At least two internal word boundaries
        trimmed.split_whitespace().count() >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use phishguard_persistence::MemoryCallLogStore;
    use phishguard_scoring::{
        CategoryLexicon, DetectorConfig, KeywordLexicon, RiskClassifier, ScoringError,
    };

    struct FixedClassifier(f32);

    #[async_trait]
    impl RiskClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<f32, ScoringError> {
            Ok(self.0)
        }
    }

    fn test_engine() -> Arc<ScoringEngine> {
        let keywords = KeywordLexicon::from_entries([
            ("대출", 2.5),
            ("계좌번호", 3.0),
            ("검찰청", 2.8),
        ]);
        let categories = CategoryLexicon::from_entries([
            ("대출", PhishingType::LoanFraud, 2.0),
            ("계좌번호", PhishingType::LoanFraud, 1.8),
            ("검찰청", PhishingType::InstitutionImpersonation, 2.6),
        ]);
        Arc::new(ScoringEngine::new(
            keywords,
            categories,
            Arc::new(FixedClassifier(0.8)),
            DetectorConfig::default(),
        ))
    }

    fn test_session() -> (HybridSession, Arc<MemoryCallLogStore>) {
        let store = Arc::new(MemoryCallLogStore::new());
        let session = HybridSession::new(test_engine(), store.clone(), SessionConfig::default());
        (session, store)
    }

    #[tokio::test]
    async fn test_empty_fragment_is_noop() {
        let (mut session, _) = test_session();
        let before = session.cumulative_score();

        let outcome = session.process_fragment("   ", false).await;
        assert_eq!(outcome.chunk_immediate.level, 0);
        assert!(!outcome.finalized);
        assert!(outcome.comprehensive.is_none());
        assert_eq!(session.cumulative_score(), before);
        assert!(session.conversation_log().is_empty());
    }

    #[tokio::test]
    async fn test_risky_final_fragment_full_flow() {
        let (mut session, _) = test_session();

        let outcome = session
            .process_fragment("대출 상담 도와드리겠습니다. 계좌번호 알려주세요.", true)
            .await;

        assert!(outcome.chunk_immediate.level >= 1);
        assert!(outcome.finalized);
        assert!(session.cumulative_score() > 0.0);
        let comprehensive = outcome.comprehensive.expect("gate is open after finalize");
        assert!(comprehensive.is_risk);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(
            outcome.immediate.phishing_type,
            Some(PhishingType::LoanFraud)
        );
    }

    #[tokio::test]
    async fn test_forced_finalization_on_terminal_punctuation() {
        let (mut session, _) = test_session();

        // No upstream final flag, but sentence-shaped pending text.
        let outcome = session
            .process_fragment("계좌번호 알려주세요.", false)
            .await;
        assert!(outcome.finalized);
        assert_eq!(session.sentence_count(), 1);
    }

    #[tokio::test]
    async fn test_short_fragment_never_force_finalizes() {
        let (mut session, _) = test_session();

        let outcome = session.process_fragment("대출.", false).await;
        assert!(!outcome.finalized);
        assert!(outcome.comprehensive.is_none());
        assert_eq!(session.sentence_count(), 0);

        // The same short text with an explicit hint does finalize.
        let (mut session, _) = test_session();
        let outcome = session.process_fragment("대출.", true).await;
        assert!(outcome.finalized);
        assert!(outcome.comprehensive.is_some());
    }

    #[tokio::test]
    async fn test_repeat_keyword_dampening() {
        let (mut session, _) = test_session();

        let mut increments = Vec::new();
        let mut prev = 0.0f32;
        for _ in 0..4 {
            session.process_fragment("대출 상품", false).await;
            let score = session.cumulative_score();
            increments.push(score - prev);
            prev = score;
        }

        // Each successive occurrence of the same keyword must add strictly
        // less: factor 1/(1+prior).
        for pair in increments.windows(2) {
            assert!(
                pair[1] < pair[0],
                "increments must shrink: {:?}",
                increments
            );
        }
        assert!((increments[0] / 2.0 - increments[1]).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_safe_decay_floors_at_zero() {
        let (mut session, _) = test_session();

        session.process_fragment("대출 상품", false).await;
        assert!(session.cumulative_score() > 0.0);

        for _ in 0..50 {
            session.process_fragment("날씨가 좋네요", false).await;
        }
        assert_eq!(session.cumulative_score(), 0.0);
    }

    #[tokio::test]
    async fn test_score_stays_in_bounds() {
        let (mut session, _) = test_session();

        for _ in 0..100 {
            session
                .process_fragment("대출 계좌번호 검찰청 계좌번호 대출", true)
                .await;
        }
        assert!(session.cumulative_score() <= 100.0);

        for _ in 0..200 {
            session.process_fragment("네 알겠습니다 감사합니다", false).await;
        }
        assert!(session.cumulative_score() >= 0.0);
    }

    #[tokio::test]
    async fn test_log_grows_only_on_finalized() {
        let (mut session, _) = test_session();

        session.process_fragment("대출", false).await;
        assert_eq!(session.conversation_log().len(), 0);

        session.process_fragment("상담 도와드리겠습니다", true).await;
        assert_eq!(session.conversation_log().len(), 1);

        session.process_fragment("잠깐", false).await;
        assert_eq!(session.conversation_log().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_persists_and_rotates_id() {
        let (mut session, store) = test_session();

        session
            .process_fragment("대출 상담 도와드리겠습니다.", true)
            .await;
        let old_id = session.session_id().to_string();

        session.reset().await;

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, old_id);
        assert_eq!(records[0].log.len(), 1);

        assert_ne!(session.session_id(), old_id);
        assert_eq!(session.cumulative_score(), 0.0);
        assert_eq!(session.sentence_count(), 0);
        assert!(session.conversation_log().is_empty());

        // Second reset: nothing to persist, only the id rotates.
        let id_after_first = session.session_id().to_string();
        session.reset().await;
        assert_eq!(store.records().len(), 1);
        assert_ne!(session.session_id(), id_after_first);
        assert_eq!(session.cumulative_score(), 0.0);
    }

    #[tokio::test]
    async fn test_sessions_do_not_cross_contaminate() {
        let engine = test_engine();
        let store = Arc::new(MemoryCallLogStore::new());
        let mut a = HybridSession::new(engine.clone(), store.clone(), SessionConfig::default());
        let mut b = HybridSession::new(engine, store, SessionConfig::default());

        a.process_fragment("대출 계좌번호 알려주세요.", true).await;
        b.process_fragment("오늘 날씨가 좋네요.", true).await;

        assert!(a.cumulative_score() > 0.0);
        assert_eq!(b.cumulative_score(), 0.0);
        assert_eq!(a.conversation_log().len(), 1);
        assert_eq!(b.conversation_log().len(), 1);
        assert_ne!(a.session_id(), b.session_id());
    }

    #[tokio::test]
    async fn test_add_sentence_direct_use() {
        let (mut session, _) = test_session();

        let outcome = session.add_sentence("대출 상담 도와드리겠습니다").await;
        assert!(outcome.immediate.level >= 1);
        assert!(outcome.comprehensive.is_some());
        assert_eq!(session.sentence_count(), 1);
        assert_eq!(session.conversation_log().len(), 1);

        let outcome = session.add_sentence("   ").await;
        assert_eq!(outcome.immediate.level, 0);
        assert!(outcome.comprehensive.is_none());
        assert_eq!(session.sentence_count(), 1);
    }

    #[tokio::test]
    async fn test_window_buffer_evicts_oldest() {
        let (mut session, _) = test_session();

        for i in 0..8 {
            session
                .add_sentence(&format!("문장 번호 {} 입니다", i))
                .await;
        }
        assert_eq!(session.sentence_count(), 8);
        assert_eq!(session.fragment_buffer.len(), 5);
        assert_eq!(session.fragment_buffer[0], "문장 번호 3 입니다");
    }
}
