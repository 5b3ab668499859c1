use std::sync::Arc;

use tracing::debug;

use faqdb_core::error::{Error, Result};
use faqdb_core::traits::{Embedder, VectorIndex};
use faqdb_core::types::{EmbedRole, Entry, SearchHit};

use crate::index::FlatIpIndex;

/// Semantic fallback over the entry questions.
///
/// Row `i` of the index is the question of entry `i`, so hits index straight
/// into the entry collection.
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    index: FlatIpIndex,
    top_k: usize,
}

impl VectorRetriever {
    /// Embeds every question with the document role and indexes it.
    pub fn build(embedder: Arc<dyn Embedder>, entries: &[Entry], top_k: usize) -> Result<Self> {
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let vectors = embedder.embed_batch(&questions, EmbedRole::Document)?;
        Self::from_vectors(embedder, &vectors, top_k)
    }

    /// Indexes precomputed question vectors, e.g. ones served from the
    /// embedding cache. They must come from `embedder`.
    pub fn from_vectors(embedder: Arc<dyn Embedder>, vectors: &[Vec<f32>], top_k: usize) -> Result<Self> {
        let mut index = FlatIpIndex::new(embedder.dim());
        index.add(vectors)?;
        debug!(rows = index.len(), dim = index.dim(), embedder = embedder.embedder_id(), "vector index built");
        Ok(Self { embedder, index, top_k })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top `min(top_k, len)` hits, best first.
    pub fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        let mut vectors = self.embedder.embed_batch(&[query.to_string()], EmbedRole::Query)?;
        let q = vectors
            .pop()
            .ok_or_else(|| Error::Operation("embedder returned no vector for the query".into()))?;
        let hits = self.index.search(&q, self.top_k)?;
        debug!(query, hits = hits.len(), best = hits.first().map(|h| h.score), "vector retrieval");
        Ok(hits)
    }
}
