//! Session tuning constants

/// Per-session behavior configuration.
///
/// The gain/decay constants and the forced-finalization thresholds are
/// empirical calibration values, not contracts; only the shape of the rules
/// is fixed.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Recent-sentence buffer capacity (oldest evicted beyond this)
    pub window_size: usize,

    /// Multiplier on a risky chunk's probability when growing the
    /// cumulative score
    pub risk_gain: f32,

    /// Flat amount subtracted from the cumulative score on a safe chunk.
    /// Asymmetric on purpose: one risky utterance should not be washed out
    /// by subsequent filler speech.
    pub safe_decay: f32,

    /// Enable finalizing fragments without an upstream final flag
    pub force_finalize: bool,

    /// Minimum pending-text length (chars) before forced finalization can fire
    pub min_chars_force_final: usize,

    /// Minimum accumulated length (chars) to run comprehensive analysis
    pub min_chars_comprehensive: usize,

    /// Minimum finalized-sentence count to run comprehensive analysis
    pub min_sentences_comprehensive: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            risk_gain: 1.0,
            safe_decay: 1.5,
            force_finalize: true,
            min_chars_force_final: 6,
            min_chars_comprehensive: 6,
            min_sentences_comprehensive: 1,
        }
    }
}
