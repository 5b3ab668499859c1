//! Domain types shared by the matchers, the retriever and the corpus builder.

use serde::{Deserialize, Serialize};

/// Position of an entry in the loaded collection. It is also the row of the
/// entry's question vector in the vector index.
pub type EntryIndex = usize;

/// A knowledge-base record.
///
/// Entries are immutable and carry no id: their position in the ordered
/// collection is their identity, and that order is also the keyword
/// matcher's tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub category: String,
    pub question: String,
    pub answer: String,
}

impl Entry {
    pub fn new(
        category: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// The `{question, answer}` object stored in entry files. The category is
/// assigned at load time from the source the file matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl From<&Entry> for QaPair {
    fn from(entry: &Entry) -> Self {
        Self {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
        }
    }
}

/// A raw, non-deleted document handed to the corpus builder.
///
/// `version_token` is opaque; two runs that see the same token for the same
/// `id` treat the content as unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub version_token: String,
}

impl SourceDocument {
    /// The `"title: content"` block the chunker and the summary generator see.
    pub fn text_block(&self) -> String {
        format!("{}: {}", self.title, self.content)
    }
}

/// Instruction framing for the embedding model. Indexed questions and
/// incoming user queries are embedded with different prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbedRole {
    Document,
    Query,
}

impl EmbedRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedRole::Document => "document",
            EmbedRole::Query => "query",
        }
    }
}

/// Indicates which matcher produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Keyword,
    Vector,
}

/// The minimal surface returned by both matchers.
///
/// `index` points into the entry collection. `score` is matcher-specific but
/// higher is always better: a fixed confidence level for keyword hits, a
/// cosine similarity for vector hits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub index: EntryIndex,
    pub score: f32,
}

/// The entry the decision policy settled on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub index: EntryIndex,
    pub score: f32,
    pub source: SourceKind,
    /// Set when the best vector hit fell below the similarity floor. The
    /// entry is still returned; the answer generator is expected to hedge.
    pub low_confidence: bool,
}
