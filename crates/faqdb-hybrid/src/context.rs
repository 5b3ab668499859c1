//! The immutable query-time context and its atomic replacement.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use faqdb_core::config::{resolve_with_base, Settings};
use faqdb_core::entry_set::load_entries;
use faqdb_core::error::{Error, Result};
use faqdb_core::traits::{Embedder, QueryRewriter};
use faqdb_core::types::{EmbedRole, Entry, SearchHit, Selection};
use faqdb_text::{KeywordMatcher, SynonymTable};
use faqdb_vector::cache::{embed_with_cache, EmbeddingCache};
use faqdb_vector::VectorRetriever;

use crate::policy::DecisionPolicy;

/// Everything a query needs, built once and read-only afterwards.
///
/// Entry `i`, keyword candidate `i` and vector row `i` all describe the
/// same record.
pub struct ServiceContext {
    entries: Vec<Entry>,
    rewriter: SynonymTable,
    quick_answers: BTreeMap<String, String>,
    keyword: KeywordMatcher,
    vector: VectorRetriever,
    policy: DecisionPolicy,
}

impl ServiceContext {
    /// Embeds every question with `embedder` and builds both matchers.
    pub fn new(entries: Vec<Entry>, settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let vector = VectorRetriever::build(embedder, &entries, settings.retrieval.top_k)?;
        Ok(Self::assemble(entries, settings, vector))
    }

    /// Like [`ServiceContext::new`] with question vectors computed elsewhere,
    /// one per entry in entry order.
    pub fn with_vectors(
        entries: Vec<Entry>,
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        vectors: &[Vec<f32>],
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if vectors.len() != entries.len() {
            return Err(Error::Operation(format!(
                "{} question vectors for {} entries",
                vectors.len(),
                entries.len()
            )));
        }
        let vector = VectorRetriever::from_vectors(embedder, vectors, settings.retrieval.top_k)?;
        Ok(Self::assemble(entries, settings, vector))
    }

    /// Loads the configured entry sources under `base_dir` and embeds the
    /// questions, going through the embedding cache when one is configured.
    pub async fn load(base_dir: &Path, settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let corpus_dir = resolve_with_base(base_dir, &settings.corpus.dir);
        let entries = load_entries(&corpus_dir, &settings.corpus.sources)?;
        if entries.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let cache = match &settings.embedding.cache_db {
            Some(db) => {
                let uri = resolve_with_base(base_dir, db);
                match EmbeddingCache::open(&uri.to_string_lossy(), &settings.embedding.cache_table, embedder.dim()).await {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!(error = %e, db = %uri.display(), "embedding cache unavailable");
                        None
                    }
                }
            }
            None => None,
        };
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let vectors = embed_with_cache(cache.as_ref(), embedder.as_ref(), &questions, EmbedRole::Document).await?;
        let ctx = Self::with_vectors(entries, settings, embedder, &vectors)?;
        info!(entries = ctx.len(), dir = %corpus_dir.display(), "service context ready");
        Ok(ctx)
    }

    fn assemble(entries: Vec<Entry>, settings: &Settings, vector: VectorRetriever) -> Self {
        let keyword = KeywordMatcher::new(&entries, settings.retrieval.clone());
        Self {
            entries,
            rewriter: SynonymTable::new(settings.synonyms.clone()),
            quick_answers: settings.quick_answers.clone(),
            keyword,
            vector,
            policy: DecisionPolicy::new(settings.retrieval.similarity_floor),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Literal answer for a query that equals a configured quick question
    /// after trimming.
    pub fn quick_answer(&self, raw_query: &str) -> Option<&str> {
        self.quick_answers.get(raw_query.trim()).map(String::as_str)
    }

    pub fn normalize(&self, raw_query: &str) -> String {
        self.rewriter.rewrite(raw_query)
    }

    /// Keyword match for an already normalized query.
    pub fn keyword_hit(&self, normalized: &str) -> Option<SearchHit> {
        self.keyword.find(normalized)
    }

    /// Vector candidates for an already normalized query.
    pub fn vector_candidates(&self, normalized: &str) -> Result<Vec<SearchHit>> {
        self.vector.retrieve(normalized)
    }

    /// Normalizes the query and picks an entry. Always returns an index into
    /// [`ServiceContext::entries`].
    pub fn select(&self, raw_query: &str) -> Result<Selection> {
        let normalized = self.normalize(raw_query);
        if let Some(hit) = self.keyword_hit(&normalized) {
            debug!(index = hit.index, score = hit.score, "keyword match");
            return self.policy.decide(Some(hit), &[]).ok_or(Error::EmptyCorpus);
        }
        let hits = self.vector_candidates(&normalized)?;
        self.policy.decide(None, &hits).ok_or(Error::EmptyCorpus)
    }
}

/// Holds the current context. A rebuild swaps the whole context under one
/// write lock, so readers see either the old or the new one.
pub struct SharedContext {
    inner: RwLock<Arc<ServiceContext>>,
}

impl SharedContext {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { inner: RwLock::new(Arc::new(ctx)) }
    }

    pub fn current(&self) -> Arc<ServiceContext> {
        self.inner.read().clone()
    }

    /// Installs `ctx` and returns the context it replaced.
    pub fn swap(&self, ctx: ServiceContext) -> Arc<ServiceContext> {
        let next = Arc::new(ctx);
        let prev = std::mem::replace(&mut *self.inner.write(), next);
        info!(previous = prev.len(), current = self.inner.read().len(), "service context swapped");
        prev
    }
}
