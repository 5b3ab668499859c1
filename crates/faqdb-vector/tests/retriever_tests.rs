use std::sync::Arc;

use faqdb_core::error::Error;
use faqdb_core::traits::{Embedder, VectorIndex};
use faqdb_core::types::{EmbedRole, Entry};
use faqdb_embed::FakeEmbedder;
use faqdb_vector::{FlatIpIndex, VectorRetriever};

fn entries(questions: &[&str]) -> Vec<Entry> {
    questions.iter().map(|q| Entry::new("test", *q, "a")).collect()
}

#[test]
fn search_returns_min_k_n_descending_in_range() {
    let mut idx = FlatIpIndex::new(3);
    idx.add(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![1.0, 1.0, 0.0], vec![-1.0, 0.0, 0.0]]).unwrap();
    let hits = idx.search(&[2.0, 0.0, 0.0], 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].index, 0);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    for w in hits.windows(2) {
        assert!(w[0].score >= w[1].score);
    }
    let all = idx.search(&[0.0, 0.0, 1.0], 10).unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|h| (-1.0..=1.0).contains(&h.score)));
}

#[test]
fn ties_break_by_ascending_index() {
    let mut idx = FlatIpIndex::new(2);
    idx.add(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
    let hits = idx.search(&[1.0, 0.0], 2).unwrap();
    assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn dimension_mismatch_is_rejected_not_padded() {
    let mut idx = FlatIpIndex::new(4);
    let err = idx.add(&[vec![1.0, 0.0, 0.0, 0.0], vec![1.0, 0.0]]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, got: 2 }));
    assert!(idx.is_empty(), "a bad batch adds nothing");
    assert!(matches!(idx.search(&[1.0], 1), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn zero_query_scores_zero_everywhere() {
    let mut idx = FlatIpIndex::new(2);
    idx.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    let hits = idx.search(&[0.0, 0.0], 2).unwrap();
    assert!(hits.iter().all(|h| h.score == 0.0 && !h.score.is_nan()));
}

#[test]
fn retriever_finds_the_identical_question_first() {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(256));
    let es = entries(&["주차 등록 방법", "재택근무 신청 방법", "법인카드 분실 신고"]);
    let r = VectorRetriever::build(embedder, &es, 3).unwrap();
    assert_eq!(r.len(), 3);
    let hits = r.retrieve("재택근무 신청 방법").unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].index, 1);
    assert!((hits[0].score - 1.0).abs() < 1e-4);
}

#[test]
fn retriever_caps_results_at_collection_size() {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(32));
    let r = VectorRetriever::build(embedder, &entries(&["only one"]), 3).unwrap();
    assert_eq!(r.retrieve("anything").unwrap().len(), 1);
}

#[test]
fn precomputed_vectors_must_match_embedder_dim() {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(8));
    let vectors = FakeEmbedder::new(4).embed_batch(&["x".to_string()], EmbedRole::Document).unwrap();
    assert!(matches!(
        VectorRetriever::from_vectors(embedder, &vectors, 3),
        Err(Error::DimensionMismatch { expected: 8, got: 4 })
    ));
}
