//! Transcript types for STT output

use serde::{Deserialize, Serialize};

/// One piece of transcript text delivered by an STT backend.
///
/// A fragment may later be revised (partial) or locked in (final);
/// `is_final` carries the backend's own finality hint, which downstream
/// consumers may override with their own finalization heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Transcribed text
    pub text: String,

    /// Did the backend mark this result as final?
    pub is_final: bool,
}

impl TranscriptFragment {
    /// Create a new transcript fragment
    pub fn new(text: impl Into<String>, is_final: bool) -> Self {
        Self {
            text: text.into(),
            is_final,
        }
    }

    /// Create a partial (non-final) fragment
    pub fn partial(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// Create a final fragment
    pub fn final_result(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    /// Text with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Check if the fragment carries no usable text
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
