//! Comprehensive classifier capability
//!
//! The trained model is an external collaborator; the engine only needs a
//! `text -> positive-class probability` function. Implementations must be
//! safe for concurrent read-only use across sessions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::lexicon::KeywordLexicon;
use crate::tokenize::content_tokens;
use crate::ScoringError;

/// A classifier over accumulated conversation text.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    /// Positive-class probability in [0.0, 1.0] that the conversation is a
    /// phishing call. May suspend for the duration of a model inference.
    async fn classify(&self, text: &str) -> Result<f32, ScoringError>;
}

/// Lexicon-backed fallback classifier.
///
/// Stands in when no trained model is wired up: saturating transform of the
/// summed keyword weights, so a single strong trigger word already moves the
/// probability well past the decision threshold.
pub struct LexiconRiskClassifier {
    lexicon: Arc<KeywordLexicon>,
    weight_threshold: f32,
}

impl LexiconRiskClassifier {
    pub fn new(lexicon: Arc<KeywordLexicon>, weight_threshold: f32) -> Self {
        Self {
            lexicon,
            weight_threshold,
        }
    }
}

#[async_trait]
impl RiskClassifier for LexiconRiskClassifier {
    async fn classify(&self, text: &str) -> Result<f32, ScoringError> {
        let mut evidence = 0.0f32;
        for token in content_tokens(text) {
            if let Some(weight) = self.lexicon.weight(&token) {
                if weight > self.weight_threshold {
                    evidence += weight - 1.0;
                }
            }
        }

        Ok(1.0 - (-evidence).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_keywords_is_zero() {
        let lexicon = Arc::new(KeywordLexicon::from_entries([("대출", 2.5)]));
        let classifier = LexiconRiskClassifier::new(lexicon, 1.3);
        let p = classifier.classify("오늘 날씨가 좋네요").await.unwrap();
        assert_eq!(p, 0.0);
    }

    #[tokio::test]
    async fn test_probability_grows_with_evidence() {
        let lexicon = Arc::new(KeywordLexicon::from_entries([
            ("대출", 2.5),
            ("계좌번호", 3.0),
        ]));
        let classifier = LexiconRiskClassifier::new(lexicon, 1.3);

        let one = classifier.classify("대출 받으세요").await.unwrap();
        let two = classifier
            .classify("대출 받으시고 계좌번호 알려주세요")
            .await
            .unwrap();

        assert!(one > 0.5);
        assert!(two > one);
        assert!(two < 1.0);
    }
}
