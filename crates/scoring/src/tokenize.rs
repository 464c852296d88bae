//! Content-token extraction
//!
//! The lexicon is keyed on content words (nouns, adverbs). Without a Korean
//! morphological analyzer we approximate that by splitting on
//! non-alphanumeric characters, stripping a single trailing case particle,
//! and dropping one-character tokens.

/// Single-character case particles (josa) stripped from token tails.
const TRAILING_PARTICLES: [char; 13] = [
    '은', '는', '이', '가', '을', '를', '에', '의', '도', '만', '와', '과', '로',
];

/// Extract content-bearing tokens from `text`.
pub fn content_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(strip_particle)
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// Strip one trailing particle, keeping at least two characters.
fn strip_particle(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 2 {
        if let Some(last) = chars.last() {
            if TRAILING_PARTICLES.contains(last) {
                return chars[..chars.len() - 1].iter().collect();
            }
        }
    }
    token.to_string()
}
