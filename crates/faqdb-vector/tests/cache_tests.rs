use std::sync::atomic::{AtomicUsize, Ordering};

use faqdb_core::traits::Embedder;
use faqdb_core::types::EmbedRole;
use faqdb_embed::FakeEmbedder;
use faqdb_vector::cache::{content_hash, embed_with_cache, EmbeddingCache};

/// Counts how many texts reach the inner embedder.
struct Counting {
    inner: FakeEmbedder,
    embedded: AtomicUsize,
}

impl Embedder for Counting {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String], role: EmbedRole) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts, role)
    }
}

#[test]
fn hash_depends_on_role() {
    assert_ne!(content_hash(EmbedRole::Document, "q"), content_hash(EmbedRole::Query, "q"));
    assert_eq!(content_hash(EmbedRole::Query, "q"), content_hash(EmbedRole::Query, "q"));
}

#[tokio::test]
async fn second_pass_is_served_from_cache() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let uri = tmp.path().to_string_lossy().to_string();
    let cache = EmbeddingCache::open(&uri, "question_embeddings", 16).await?;
    let embedder = Counting { inner: FakeEmbedder::new(16), embedded: AtomicUsize::new(0) };
    let texts = vec!["휴가 신청".to_string(), "주차 등록".to_string(), "휴가 신청".to_string()];

    let first = embed_with_cache(Some(&cache), &embedder, &texts, EmbedRole::Document).await?;
    assert_eq!(first.len(), 3);
    assert_eq!(embedder.embedded.load(Ordering::SeqCst), 2, "duplicates embedded once");

    let second = embed_with_cache(Some(&cache), &embedder, &texts, EmbedRole::Document).await?;
    assert_eq!(embedder.embedded.load(Ordering::SeqCst), 2, "no new embedding work");
    assert_eq!(first, second);

    let more = vec!["휴가 신청".to_string(), "보안 교육".to_string()];
    embed_with_cache(Some(&cache), &embedder, &more, EmbedRole::Document).await?;
    assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3, "only the miss is embedded");
    Ok(())
}

#[tokio::test]
async fn cache_is_scoped_by_embedder_id() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let uri = tmp.path().to_string_lossy().to_string();
    let cache = EmbeddingCache::open(&uri, "question_embeddings", 16).await?;
    let texts = vec!["휴가 신청".to_string()];
    embed_with_cache(Some(&cache), &FakeEmbedder::new(16), &texts, EmbedRole::Document).await?;

    let found = cache.get_many("some-other-model", &[content_hash(EmbedRole::Document, "휴가 신청")]).await?;
    assert!(found.is_empty());
    Ok(())
}

#[tokio::test]
async fn without_cache_everything_is_embedded() -> anyhow::Result<()> {
    let embedder = Counting { inner: FakeEmbedder::new(8), embedded: AtomicUsize::new(0) };
    let texts = vec!["a".to_string(), "b".to_string()];
    embed_with_cache(None, &embedder, &texts, EmbedRole::Query).await?;
    embed_with_cache(None, &embedder, &texts, EmbedRole::Query).await?;
    assert_eq!(embedder.embedded.load(Ordering::SeqCst), 4);
    Ok(())
}
