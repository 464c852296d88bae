//! The scoring engine
//!
//! Owns the read-only lexicons and the injected comprehensive classifier.
//! Construction is expensive (lexicon load, classifier warm-up) and happens
//! once per process; the engine is then shared across sessions behind an
//! `Arc` and is safe for concurrent read-only use.

use std::collections::HashMap;
use std::sync::Arc;

use crate::classifier::RiskClassifier;
use crate::lexicon::{CategoryLexicon, KeywordLexicon};
use crate::result::{level_for_score, ComprehensiveResult, ImmediateResult, KeywordDetail};
use crate::tokenize::content_tokens;

/// Scoring calibration constants
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Inputs shorter than this (chars, trimmed) get the zero immediate result
    pub min_chars_immediate: usize,

    /// Inputs shorter than this (chars, trimmed) get the zero comprehensive result
    pub min_chars_comprehensive: usize,

    /// Only lexicon weights above this count toward the score
    pub weight_threshold: f32,

    /// Positive-class probability at which the comprehensive verdict flips
    /// to risky. Deliberately below 0.5: in this domain a missed phishing
    /// call costs far more than a false alarm.
    pub comprehensive_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_chars_immediate: 3,
            min_chars_comprehensive: 10,
            weight_threshold: 1.3,
            comprehensive_threshold: 0.35,
        }
    }
}

/// Shared, read-only scoring engine handle
pub struct ScoringEngine {
    keywords: KeywordLexicon,
    categories: CategoryLexicon,
    classifier: Arc<dyn RiskClassifier>,
    config: DetectorConfig,
}

impl ScoringEngine {
    pub fn new(
        keywords: KeywordLexicon,
        categories: CategoryLexicon,
        classifier: Arc<dyn RiskClassifier>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            keywords,
            categories,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Immediate word-based analysis of a single chunk.
    ///
    /// `prior_counts` holds per-call keyword occurrence counts accumulated by
    /// the caller; the dominant phishing type is chosen over the union of
    /// those counts and this chunk's keywords, so the sub-category reflects
    /// the whole call rather than one fragment. The map is not mutated.
    pub fn detect_immediate(
        &self,
        text: &str,
        prior_counts: &HashMap<String, u32>,
    ) -> ImmediateResult {
        if text.trim().chars().count() < self.config.min_chars_immediate {
            return ImmediateResult::zero();
        }

        let mut score = 0.0f32;
        let mut keywords: Vec<String> = Vec::new();
        let mut keyword_details: Vec<KeywordDetail> = Vec::new();
        let mut chunk_counts: HashMap<String, u32> = HashMap::new();

        for token in content_tokens(text) {
            let Some(weight) = self.keywords.weight(&token) else {
                continue;
            };
            if weight <= self.config.weight_threshold {
                continue;
            }

            let contribution = (weight - 1.0) * 10.0;
            score += contribution;

            let count = chunk_counts.entry(token.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                keywords.push(token.clone());
                keyword_details.push(KeywordDetail {
                    word: token,
                    weight,
                    score: contribution,
                });
            }
        }

        score = score.min(100.0);

        let phishing_type = self.dominant_type(prior_counts, &chunk_counts);

        ImmediateResult {
            level: level_for_score(score),
            probability: score,
            phishing_type,
            keywords,
            keyword_details,
        }
    }

    /// Comprehensive analysis of the accumulated conversation text.
    ///
    /// Classifier failures are absorbed here: the fragment is scored as
    /// neutral and processing continues, per the model-fault policy.
    pub async fn detect_comprehensive(&self, text: &str) -> ComprehensiveResult {
        let analyzed_length = text.trim().chars().count();
        if analyzed_length < self.config.min_chars_comprehensive {
            return ComprehensiveResult::zero();
        }

        match self.classifier.classify(text).await {
            Ok(confidence) => ComprehensiveResult {
                is_risk: confidence >= self.config.comprehensive_threshold,
                confidence,
                analyzed_length,
            },
            Err(e) => {
                tracing::warn!("Comprehensive classifier failed, scoring neutral: {}", e);
                ComprehensiveResult::zero()
            }
        }
    }

    /// Pick the dominant category over all keywords seen this call.
    ///
    /// Aggregates `count * ln(weight)` per category; the original calibration
    /// multiplied `weight^count`, which compares identically in log space
    /// without underflowing on long calls.
    fn dominant_type(
        &self,
        prior_counts: &HashMap<String, u32>,
        chunk_counts: &HashMap<String, u32>,
    ) -> Option<crate::result::PhishingType> {
        let mut merged: HashMap<&str, u32> = HashMap::new();
        for (word, count) in prior_counts {
            *merged.entry(word.as_str()).or_insert(0) += count;
        }
        for (word, count) in chunk_counts {
            *merged.entry(word.as_str()).or_insert(0) += count;
        }

        let mut totals: HashMap<crate::result::PhishingType, f32> = HashMap::new();
        for (word, count) in merged {
            if let Some((category, weight)) = self.categories.weight(word) {
                if weight > 0.0 {
                    *totals.entry(category).or_insert(0.0) += count as f32 * weight.ln();
                }
            }
        }

        totals
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(category, _)| category)
    }
}
