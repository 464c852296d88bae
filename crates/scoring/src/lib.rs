//! Risk scoring for voice-phishing detection
//!
//! Two analysis paths, multiplexed by the session layer:
//! - Immediate: fast, lexicon-weight-based scoring of a single transcript
//!   chunk. Cheap enough to run on every fragment.
//! - Comprehensive: slower scoring of the full accumulated conversation via
//!   an injected [`RiskClassifier`] capability. Gated to run only at
//!   finalization boundaries.
//!
//! Both paths are pure with respect to their text input; all per-call
//! bookkeeping (keyword history, cumulative score) belongs to the session.

pub mod classifier;
pub mod detector;
pub mod lexicon;
pub mod result;
mod tokenize;

pub use classifier::{LexiconRiskClassifier, RiskClassifier};
pub use detector::{DetectorConfig, ScoringEngine};
pub use lexicon::{CategoryLexicon, KeywordLexicon};
pub use result::{
    level_for_score, warning_message, ComprehensiveResult, ImmediateResult, KeywordDetail,
    PhishingType,
};
pub use tokenize::content_tokens;

use thiserror::Error;

/// Scoring errors
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Lexicon error: {0}")]
    Lexicon(String),

    #[error("Classifier error: {0}")]
    Classifier(String),
}

impl From<csv::Error> for ScoringError {
    fn from(e: csv::Error) -> Self {
        ScoringError::Lexicon(e.to_string())
    }
}
