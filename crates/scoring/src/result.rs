//! Scoring result types

use serde::{Deserialize, Serialize};

/// Phishing sub-category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhishingType {
    /// Loan-fraud calls (대출사기형)
    LoanFraud,
    /// Investigation-agency impersonation (수사기관사칭형)
    InstitutionImpersonation,
}

impl std::fmt::Display for PhishingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhishingType::LoanFraud => write!(f, "loan_fraud"),
            PhishingType::InstitutionImpersonation => write!(f, "institution_impersonation"),
        }
    }
}

/// One scoring keyword that fired, with its lexicon weight and the score it
/// contributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordDetail {
    pub word: String,
    pub weight: f32,
    pub score: f32,
}

/// Immediate (lexicon-based) analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmediateResult {
    /// Risk level band: 0 safe, 1 suspicious, 2 warning, 3 danger
    pub level: u8,

    /// Risk score in 0 - 100
    pub probability: f32,

    /// Dominant phishing sub-category, if any category keyword fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phishing_type: Option<PhishingType>,

    /// Detected risk keywords, deduplicated, in order of first occurrence
    pub keywords: Vec<String>,

    /// Per-keyword weight and score contribution
    pub keyword_details: Vec<KeywordDetail>,
}

impl ImmediateResult {
    /// The zero result: safe, no keywords. Returned for inputs below the
    /// minimum length gate and used as the neutral fallback on scoring
    /// failures.
    pub fn zero() -> Self {
        Self {
            level: 0,
            probability: 0.0,
            phishing_type: None,
            keywords: Vec::new(),
            keyword_details: Vec::new(),
        }
    }

    /// Did any risk keyword fire?
    pub fn is_risky(&self) -> bool {
        self.level > 0
    }
}

impl Default for ImmediateResult {
    fn default() -> Self {
        Self::zero()
    }
}

/// Comprehensive (model-based) analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveResult {
    /// Classifier verdict at the configured decision threshold
    pub is_risk: bool,

    /// Positive-class probability (0.0 - 1.0)
    pub confidence: f32,

    /// Number of characters that were analyzed
    pub analyzed_length: usize,
}

impl ComprehensiveResult {
    /// The zero result, returned for inputs below the minimum length gate
    /// and used as the neutral fallback on classifier failures.
    pub fn zero() -> Self {
        Self {
            is_risk: false,
            confidence: 0.0,
            analyzed_length: 0,
        }
    }
}

/// Map a summed keyword score to its risk level band.
///
/// Band edges follow the lexicon calibration: nothing fired means safe, up
/// to 30 is suspicious, up to 60 is a warning, beyond that danger.
pub fn level_for_score(score: f32) -> u8 {
    if score <= 0.0 {
        0
    } else if score <= 30.0 {
        1
    } else if score <= 60.0 {
        2
    } else {
        3
    }
}

/// User-facing warning for an analysis outcome.
///
/// A positive comprehensive verdict outranks the lexicon bands.
pub fn warning_message(
    immediate: Option<&ImmediateResult>,
    comprehensive: Option<&ComprehensiveResult>,
) -> Option<String> {
    if let Some(c) = comprehensive {
        if c.is_risk {
            return Some(format!(
                "보이스피싱 탐지! (신뢰도: {:.1}%)",
                c.confidence * 100.0
            ));
        }
    }

    match immediate.map(|i| i.level) {
        Some(3) => Some("위험: 보이스피싱일 가능성이 매우 높습니다!".to_string()),
        Some(2) => Some("경고: 의심스러운 단어가 감지되었습니다.".to_string()),
        Some(1) => Some("주의: 일부 단어에 주의가 필요합니다.".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bands() {
        assert_eq!(level_for_score(0.0), 0);
        assert_eq!(level_for_score(12.0), 1);
        assert_eq!(level_for_score(30.0), 1);
        assert_eq!(level_for_score(45.0), 2);
        assert_eq!(level_for_score(60.0), 2);
        assert_eq!(level_for_score(61.0), 3);
        assert_eq!(level_for_score(100.0), 3);
    }

    #[test]
    fn test_warning_message_priority() {
        let mut immediate = ImmediateResult::zero();
        immediate.level = 2;

        let comprehensive = ComprehensiveResult {
            is_risk: true,
            confidence: 0.87,
            analyzed_length: 40,
        };

        let msg = warning_message(Some(&immediate), Some(&comprehensive)).unwrap();
        assert!(msg.contains("87.0%"));

        let msg = warning_message(Some(&immediate), None).unwrap();
        assert!(msg.contains("경고"));

        assert!(warning_message(Some(&ImmediateResult::zero()), None).is_none());
    }

    #[test]
    fn test_phishing_type_serde() {
        let json = serde_json::to_string(&PhishingType::LoanFraud).unwrap();
        assert_eq!(json, "\"loan_fraud\"");
    }
}
