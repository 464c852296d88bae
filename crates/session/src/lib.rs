//! Hybrid detection session
//!
//! One `HybridSession` per live call. The session owns all per-call mutable
//! state and multiplexes between the cheap per-fragment analysis and the
//! expensive comprehensive analysis:
//! - every non-empty fragment gets an immediate lexicon score and moves the
//!   decaying cumulative risk score,
//! - fragments are buffered until finalized (by upstream hint or by the
//!   forced-finalization heuristic),
//! - finalized sentences extend the accumulated text and, behind a length /
//!   count gate, trigger the comprehensive classifier.
//!
//! The session is single-writer by construction: it is mutated exclusively
//! from the pipeline's pump task. Detection failures never abort a session;
//! they degrade to neutral results at the scoring layer.

mod config;
mod hybrid;

pub use config::SessionConfig;
pub use hybrid::{FragmentOutcome, HybridSession, SentenceOutcome};
