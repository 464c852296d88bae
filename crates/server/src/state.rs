//! Application State
//!
//! Shared state across all handlers. The scoring engine is built once here
//! (lexicon load is the expensive part) and shared read-only by every
//! session.

use std::sync::Arc;

use phishguard_config::Settings;
use phishguard_persistence::{CallLogStore, JsonlCallLogStore};
use phishguard_scoring::{
    CategoryLexicon, DetectorConfig, KeywordLexicon, LexiconRiskClassifier, ScoringEngine,
};
use phishguard_session::{HybridSession, SessionConfig};
use phishguard_stt::{SttConfig, SttProvider};

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub settings: Arc<Settings>,
    /// Shared scoring engine handle
    pub engine: Arc<ScoringEngine>,
    /// Call-log sink
    pub log_store: Arc<dyn CallLogStore>,
    /// Keyword lexicon size, for the health probe
    pub lexicon_entries: usize,
}

impl AppState {
    /// Build state from settings, loading the lexicons from disk.
    ///
    /// A missing or unreadable lexicon degrades to an empty one with a
    /// warning so the service still boots; scores are then all zero until
    /// the files appear and the process restarts.
    pub fn new(settings: Settings) -> Self {
        let keywords = match KeywordLexicon::from_csv_path(&settings.detection.keyword_lexicon_path)
        {
            Ok(lexicon) => {
                tracing::info!(
                    path = %settings.detection.keyword_lexicon_path,
                    entries = lexicon.len(),
                    "Keyword lexicon loaded"
                );
                lexicon
            }
            Err(e) => {
                tracing::warn!(
                    path = %settings.detection.keyword_lexicon_path,
                    "Keyword lexicon unavailable, scoring disabled: {}", e
                );
                KeywordLexicon::default()
            }
        };

        let categories =
            match CategoryLexicon::from_csv_path(&settings.detection.category_lexicon_path) {
                Ok(lexicon) => lexicon,
                Err(e) => {
                    tracing::warn!(
                        path = %settings.detection.category_lexicon_path,
                        "Category lexicon unavailable: {}", e
                    );
                    CategoryLexicon::default()
                }
            };

        let lexicon_entries = keywords.len();
        let classifier = Arc::new(LexiconRiskClassifier::new(
            Arc::new(keywords.clone()),
            settings.detection.weight_threshold,
        ));
        let engine = Arc::new(ScoringEngine::new(
            keywords,
            categories,
            classifier,
            DetectorConfig {
                min_chars_immediate: settings.detection.min_chars_immediate,
                weight_threshold: settings.detection.weight_threshold,
                comprehensive_threshold: settings.detection.comprehensive_threshold,
                ..DetectorConfig::default()
            },
        ));

        let log_store: Arc<dyn CallLogStore> = Arc::new(JsonlCallLogStore::new(
            &settings.persistence.call_log_path,
        ));

        Self {
            settings: Arc::new(settings),
            engine,
            log_store,
            lexicon_entries,
        }
    }

    /// Build state from pre-constructed parts (tests, embedding).
    pub fn from_parts(
        settings: Settings,
        engine: Arc<ScoringEngine>,
        log_store: Arc<dyn CallLogStore>,
        lexicon_entries: usize,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            engine,
            log_store,
            lexicon_entries,
        }
    }

    /// Session tuning derived from settings.
    pub fn session_config(&self) -> SessionConfig {
        let d = &self.settings.detection;
        SessionConfig {
            window_size: d.window_size,
            risk_gain: d.risk_gain,
            safe_decay: d.safe_decay,
            force_finalize: d.force_finalize,
            min_chars_force_final: d.min_chars_force_final,
            min_chars_comprehensive: d.min_chars_comprehensive,
            min_sentences_comprehensive: d.min_sentences_comprehensive,
        }
    }

    /// A fresh detection session bound to the shared engine and log sink.
    pub fn new_session(&self) -> HybridSession {
        HybridSession::new(
            self.engine.clone(),
            self.log_store.clone(),
            self.session_config(),
        )
    }

    /// STT connection settings, with the client's sample rate and language.
    pub fn stt_config(&self, sample_rate: u32, language: &str) -> SttConfig {
        let provider = SttProvider::parse(&self.settings.stt.provider).unwrap_or_else(|_| {
            tracing::warn!(
                provider = %self.settings.stt.provider,
                "Unknown STT provider in settings, falling back to gRPC"
            );
            SttProvider::Grpc
        });

        SttConfig {
            provider,
            grpc_endpoint: self.settings.stt.grpc_endpoint.clone(),
            ws_url: self.settings.stt.ws_url.clone(),
            sample_rate,
            language: language.to_string(),
        }
    }
}
