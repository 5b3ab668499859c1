use tracing::warn;

use faqdb_core::types::{SearchHit, Selection, SourceKind};

/// Chooses between a keyword hit and the vector fallback.
///
/// A keyword hit is authoritative. Without one, the best vector hit is
/// returned even below `similarity_floor`, flagged as low confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub similarity_floor: f32,
}

impl DecisionPolicy {
    pub fn new(similarity_floor: f32) -> Self {
        Self { similarity_floor }
    }

    pub fn decide(&self, keyword: Option<SearchHit>, vector_hits: &[SearchHit]) -> Option<Selection> {
        if let Some(hit) = keyword {
            return Some(Selection { index: hit.index, score: hit.score, source: SourceKind::Keyword, low_confidence: false });
        }
        let best = vector_hits.first()?;
        let low_confidence = best.score < self.similarity_floor;
        if low_confidence {
            warn!(index = best.index, score = best.score, floor = self.similarity_floor, "low-confidence selection");
        }
        Some(Selection { index: best.index, score: best.score, source: SourceKind::Vector, low_confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(index: usize, score: f32) -> SearchHit {
        SearchHit { index, score }
    }

    #[test]
    fn keyword_hit_wins_over_better_vector_score() {
        let s = DecisionPolicy::new(0.4).decide(Some(hit(2, 0.95)), &[hit(0, 0.99)]).unwrap();
        assert_eq!((s.index, s.source, s.low_confidence), (2, SourceKind::Keyword, false));
    }

    #[test]
    fn floor_is_inclusive() {
        let p = DecisionPolicy::new(0.4);
        assert!(!p.decide(None, &[hit(1, 0.4)]).unwrap().low_confidence);
        assert!(p.decide(None, &[hit(1, 0.39)]).unwrap().low_confidence);
    }

    #[test]
    fn nothing_to_choose_from() {
        assert_eq!(DecisionPolicy::new(0.4).decide(None, &[]), None);
    }
}
