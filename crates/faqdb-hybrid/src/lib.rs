//! faqdb-hybrid
//!
//! Query-time orchestration: quick answers, synonym normalization, the
//! keyword matcher, the vector fallback and the decision policy, ending in a
//! call to the answer generator.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use faqdb_core::error::{Error, Result};
use faqdb_core::traits::AnswerGenerator;
use faqdb_core::types::Selection;

pub mod context;
pub mod policy;

pub use context::{ServiceContext, SharedContext};
pub use policy::DecisionPolicy;

/// What `ask` produced, and by which path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Answer {
    Quick(String),
    Generated { selection: Selection, text: String },
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Quick(text) => text,
            Answer::Generated { text, .. } => text,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Answer::Quick(_) => None,
            Answer::Generated { selection, .. } => Some(selection),
        }
    }
}

/// Answers one question.
///
/// Retrieval runs on the blocking pool and is abandoned after
/// `retrieval_timeout`. The generator gets the selected entry, the raw query
/// and the low-confidence flag.
pub async fn ask(
    ctx: Arc<ServiceContext>,
    generator: &dyn AnswerGenerator,
    question: &str,
    retrieval_timeout: Duration,
) -> Result<Answer> {
    if let Some(text) = ctx.quick_answer(question) {
        info!("quick answer");
        return Ok(Answer::Quick(text.to_string()));
    }

    let query = question.to_string();
    let worker = Arc::clone(&ctx);
    let task = tokio::task::spawn_blocking(move || worker.select(&query));
    let selection = match tokio::time::timeout(retrieval_timeout, task).await {
        Ok(Ok(res)) => res?,
        Ok(Err(join)) => return Err(Error::Operation(format!("retrieval task failed: {}", join))),
        Err(_) => {
            return Err(Error::Operation(format!(
                "retrieval timed out after {} ms",
                retrieval_timeout.as_millis()
            )))
        }
    };

    let entry = ctx
        .entry(selection.index)
        .ok_or_else(|| Error::NotFound(format!("entry {}", selection.index)))?;
    debug!(index = selection.index, score = selection.score, source = ?selection.source, low_confidence = selection.low_confidence, question = %entry.question, "selected entry");
    let text = generator.generate_answer(entry, question, selection.low_confidence).await?;
    Ok(Answer::Generated { selection, text })
}
