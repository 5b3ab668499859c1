//! Deterministic lexical matching over the ordered entry collection.
//!
//! Candidates are scanned in collection order and the first qualifying one
//! wins. Textual equality or containment (after [`normalize_for_match`])
//! scores `exact_score`; otherwise a strict token-overlap rule can qualify a
//! candidate with `overlap_score`.

use std::collections::HashSet;

use faqdb_core::config::RetrievalSettings;
use faqdb_core::types::{Entry, SearchHit};
use tracing::debug;

/// Drops whitespace and `?`, `!`, `.` and lowercases the rest.
pub fn normalize_for_match(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '?' | '!' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

struct Candidate {
    normalized: String,
    tokens: HashSet<String>,
}

pub struct KeywordMatcher {
    settings: RetrievalSettings,
    particles: Vec<char>,
    candidates: Vec<Candidate>,
}

impl KeywordMatcher {
    /// Precomputes the normalized form and token set of every question.
    /// Candidate order is the order of `entries`.
    pub fn new(entries: &[Entry], settings: RetrievalSettings) -> Self {
        let particles: Vec<char> = settings.particles.chars().collect();
        let mut matcher = Self { settings, particles, candidates: Vec::with_capacity(entries.len()) };
        matcher.candidates = entries
            .iter()
            .map(|e| Candidate {
                normalized: normalize_for_match(&e.question),
                tokens: matcher.tokens(&e.question),
            })
            .collect();
        matcher
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whitespace tokens of at least `min_token_chars` characters with
    /// trailing particles stripped.
    pub fn tokens(&self, text: &str) -> HashSet<String> {
        text.split_whitespace()
            .filter(|w| w.chars().count() >= self.settings.min_token_chars)
            .map(|w| w.trim_end_matches(self.particles.as_slice()))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// First qualifying candidate, or `None` when nothing qualifies.
    pub fn find(&self, query: &str) -> Option<SearchHit> {
        let q_norm = normalize_for_match(query);
        let q_tokens = self.tokens(query);

        for (index, cand) in self.candidates.iter().enumerate() {
            if contains_either_way(&q_norm, &cand.normalized) {
                debug!(index, "keyword match: normalized text contained");
                return Some(SearchHit { index, score: self.settings.exact_score });
            }
            if self.overlap_qualifies(&q_tokens, &cand.tokens) {
                debug!(index, "keyword match: token overlap");
                return Some(SearchHit { index, score: self.settings.overlap_score });
            }
        }
        None
    }

    fn overlap_qualifies(&self, query: &HashSet<String>, candidate: &HashSet<String>) -> bool {
        if candidate.len() < self.settings.min_candidate_tokens {
            return false;
        }
        let shared = candidate.intersection(query).count();
        if shared < self.settings.min_overlap {
            return false;
        }
        shared as f32 / candidate.len() as f32 >= self.settings.overlap_ratio
    }
}

fn contains_either_way(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_spacing_punctuation_and_case() {
        assert_eq!(normalize_for_match(" VPN 접속은 어떻게 하나요?! "), "vpn접속은어떻게하나요");
        assert_eq!(normalize_for_match("Wi-Fi. Password"), "wi-fipassword");
    }

    #[test]
    fn empty_text_never_contains_or_is_contained() {
        assert!(!contains_either_way("", "abc"));
        assert!(!contains_either_way("abc", ""));
    }
}
