//! Risk keyword lexicons
//!
//! Two CSV-backed tables, loaded once per process and shared read-only
//! across sessions:
//! - keyword weights: `word,weight` rows, the per-token risk calibration
//! - category weights: `word,category,weight` rows, used to pick the
//!   dominant phishing sub-category

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::result::PhishingType;
use crate::ScoringError;

#[derive(Debug, Deserialize)]
struct KeywordRow {
    word: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    word: String,
    category: PhishingType,
    weight: f32,
}

/// Per-word risk weights
#[derive(Debug, Clone, Default)]
pub struct KeywordLexicon {
    weights: HashMap<String, f32>,
}

impl KeywordLexicon {
    /// Load from a `word,weight` CSV file.
    ///
    /// Malformed rows are skipped with a warning rather than failing the
    /// whole load; a damaged calibration row must not take the service down.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut weights = HashMap::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<KeywordRow>() {
            match row {
                Ok(row) => {
                    weights.insert(row.word, row.weight);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping malformed keyword lexicon row: {}", e);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "Keyword lexicon loaded with {} malformed rows skipped ({} entries)",
                skipped,
                weights.len()
            );
        }

        Ok(Self { weights })
    }

    /// Build from in-memory entries (tests, fallback wiring).
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            weights: entries.into_iter().map(|(w, p)| (w.into(), p)).collect(),
        }
    }

    /// Risk weight for a token, if it is in the lexicon.
    pub fn weight(&self, word: &str) -> Option<f32> {
        self.weights.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Per-word category weights for phishing-type classification
#[derive(Debug, Clone, Default)]
pub struct CategoryLexicon {
    weights: HashMap<String, (PhishingType, f32)>,
}

impl CategoryLexicon {
    /// Load from a `word,category,weight` CSV file. Malformed rows are
    /// skipped with a warning.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut weights = HashMap::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<CategoryRow>() {
            match row {
                Ok(row) => {
                    weights.insert(row.word, (row.category, row.weight));
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping malformed category lexicon row: {}", e);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "Category lexicon loaded with {} malformed rows skipped ({} entries)",
                skipped,
                weights.len()
            );
        }

        Ok(Self { weights })
    }

    /// Build from in-memory entries (tests, fallback wiring).
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, PhishingType, f32)>,
        S: Into<String>,
    {
        Self {
            weights: entries
                .into_iter()
                .map(|(w, t, p)| (w.into(), (t, p)))
                .collect(),
        }
    }

    /// Category and weight for a keyword, if categorized.
    pub fn weight(&self, word: &str) -> Option<(PhishingType, f32)> {
        self.weights.get(word).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_keyword_lexicon_from_entries() {
        let lexicon = KeywordLexicon::from_entries([("대출", 2.5), ("계좌번호", 3.0)]);
        assert_eq!(lexicon.weight("대출"), Some(2.5));
        assert_eq!(lexicon.weight("날씨"), None);
        assert_eq!(lexicon.len(), 2);
    }

    #[test]
    fn test_keyword_lexicon_skips_malformed_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "word,weight").unwrap();
        writeln!(file, "대출,2.5").unwrap();
        writeln!(file, "깨진행,not-a-number").unwrap();
        writeln!(file, "검찰,2.8").unwrap();
        file.flush().unwrap();

        let lexicon = KeywordLexicon::from_csv_path(file.path()).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.weight("검찰"), Some(2.8));
        assert_eq!(lexicon.weight("깨진행"), None);
    }

    #[test]
    fn test_category_lexicon_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "word,category,weight").unwrap();
        writeln!(file, "대출,loan_fraud,2.0").unwrap();
        writeln!(file, "검찰,institution_impersonation,2.4").unwrap();
        file.flush().unwrap();

        let lexicon = CategoryLexicon::from_csv_path(file.path()).unwrap();
        assert_eq!(
            lexicon.weight("대출"),
            Some((PhishingType::LoanFraud, 2.0))
        );
        assert_eq!(
            lexicon.weight("검찰"),
            Some((PhishingType::InstitutionImpersonation, 2.4))
        );
    }
}
