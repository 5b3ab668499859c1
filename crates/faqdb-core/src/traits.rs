use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EmbedRole, Entry, SearchHit, SourceDocument};

pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `e5-large-instruct:d1024`).
    /// Cached vectors are only reused under the same id.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Returns one L2-normalized vector of length `dim()` per input text.
    fn embed_batch(&self, texts: &[String], role: EmbedRole) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Inner-product index over unit vectors. Rows are addressed by insertion
/// position, which must line up with the entry collection.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Canonicalizes a raw query before matching.
pub trait QueryRewriter: Send + Sync {
    fn rewrite(&self, query: &str) -> String;
}

/// Read-only listing of the documents the corpus is built from.
pub trait SourceStore: Send + Sync {
    /// Non-deleted documents in a stable order.
    fn list(&self) -> anyhow::Result<Vec<SourceDocument>>;
}

/// Phrases the final user-facing answer from the selected entry.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate_answer(
        &self,
        entry: &Entry,
        query: &str,
        low_confidence: bool,
    ) -> anyhow::Result<String>;
}

/// Writes one FAQ-style question for a chunk of source text. The raw model
/// output is returned; labels and length are cleaned up by the caller.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_question(&self, chunk: &str) -> anyhow::Result<String>;
}

/// Fields recovered from an overall-summary response. A missing field means
/// the response could not be parsed for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverallFaq {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Writes one question/answer pair summarising a whole source document.
#[async_trait]
pub trait OverallFaqGenerator: Send + Sync {
    async fn generate_overall_faq(&self, title: &str, text: &str) -> anyhow::Result<OverallFaq>;
}
