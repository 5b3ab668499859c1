//! Source documents → cached, chunked FAQ entries → sharded entry files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use faqdb_core::config::Settings;
use faqdb_core::data_processor::{truncate_chars, DataProcessor};
use faqdb_core::entry_set::write_shards;
use faqdb_core::error::{Error, Result};
use faqdb_core::traits::{OverallFaqGenerator, QuestionGenerator, SourceStore};
use faqdb_core::types::{Entry, QaPair, SourceDocument};

use crate::cache::{CacheRecord, EntryCache};
use crate::throttle::Throttle;

const QUESTION_LABELS: [&str; 4] = ["질문:", "Question:", "Q:", "Q."];

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub reused: usize,
    pub regenerated: usize,
    /// Cache records dropped because their document disappeared.
    pub removed: usize,
    pub entries: usize,
    pub generation_calls: usize,
    pub shards: Vec<PathBuf>,
}

pub struct CorpusBuilder {
    processor: DataProcessor,
    category: String,
    base_name: String,
    max_per_file: usize,
    questions: Arc<dyn QuestionGenerator>,
    overall: Arc<dyn OverallFaqGenerator>,
    throttle: Throttle,
}

impl CorpusBuilder {
    pub fn new(
        settings: &Settings,
        questions: Arc<dyn QuestionGenerator>,
        overall: Arc<dyn OverallFaqGenerator>,
    ) -> Self {
        Self {
            processor: DataProcessor::new(settings.chunking.clone()),
            category: settings.corpus.category.clone(),
            base_name: settings.corpus.output_base_name.clone(),
            max_per_file: settings.corpus.max_entries_per_file,
            questions,
            overall,
            throttle: Throttle::from_millis(settings.generation.min_call_spacing_ms),
        }
    }

    /// Runs one incremental build.
    ///
    /// Documents whose version token matches the cache reuse their entries
    /// without any generation call. The cache is saved whether or not the
    /// run succeeds; shards are written to `output_dir` only on success and
    /// never when it is `None`.
    pub async fn run(
        &mut self,
        store: &dyn SourceStore,
        cache: &mut EntryCache,
        output_dir: Option<&Path>,
    ) -> Result<BuildReport> {
        let docs = store.list()?;
        if docs.is_empty() {
            return Err(Error::EmptySourceSet);
        }
        info!(documents = docs.len(), cached = cache.len(), "corpus build started");

        let mut report = BuildReport { documents: docs.len(), ..BuildReport::default() };
        let pb = progress_bar(docs.len());
        let outcome = self.process(&docs, cache, &mut report, &pb).await;

        report.removed = cache.retain_ids(docs.iter().map(|d| d.id.as_str()));
        let saved = cache.save();

        let entries = match outcome {
            Ok(entries) => entries,
            Err(e) => {
                pb.abandon_with_message("build failed");
                if let Err(save_err) = saved {
                    warn!(error = %save_err, "entry cache could not be saved after a failed build");
                }
                return Err(e);
            }
        };
        saved?;
        pb.finish_with_message("done");

        report.entries = entries.len();
        if let Some(dir) = output_dir {
            report.shards = write_shards(dir, &self.base_name, self.max_per_file, &entries)?;
        }
        info!(
            reused = report.reused,
            regenerated = report.regenerated,
            removed = report.removed,
            entries = report.entries,
            shards = report.shards.len(),
            "corpus build finished"
        );
        Ok(report)
    }

    async fn process(
        &mut self,
        docs: &[SourceDocument],
        cache: &mut EntryCache,
        report: &mut BuildReport,
        pb: &ProgressBar,
    ) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        for doc in docs {
            pb.set_message(doc.title.clone());
            let pairs = match cache.lookup(&doc.id, &doc.version_token) {
                Some(pairs) => {
                    debug!(id = %doc.id, "cache hit");
                    report.reused += 1;
                    pairs.to_vec()
                }
                None => {
                    let pairs = self
                        .generate_document(doc, report)
                        .await
                        .map_err(|e| Error::Collaborator(e.context(format!("document {}", doc.id))))?;
                    cache.insert(
                        doc.id.clone(),
                        CacheRecord { version_token: doc.version_token.clone(), entries: pairs.clone() },
                    );
                    report.regenerated += 1;
                    pairs
                }
            };
            out.extend(pairs.into_iter().map(|p| Entry::new(self.category.clone(), p.question, p.answer)));
            pb.inc(1);
        }
        Ok(out)
    }

    /// Chunk entries in order, then the overall entry.
    async fn generate_document(&mut self, doc: &SourceDocument, report: &mut BuildReport) -> anyhow::Result<Vec<QaPair>> {
        let text = doc.text_block();
        let chunks = self.processor.split_to_chunks(&text);
        let max_q = self.processor.settings().question_max_chars;
        info!(id = %doc.id, chunks = chunks.len(), "generating entries");

        let mut pairs = Vec::with_capacity(chunks.len() + 1);
        for chunk in chunks {
            self.throttle.wait().await;
            let raw = self.questions.generate_question(&chunk).await?;
            report.generation_calls += 1;
            let question = clean_question(&raw, &chunk, max_q);
            pairs.push(QaPair { question, answer: chunk });
        }

        self.throttle.wait().await;
        let overall = self.overall.generate_overall_faq(&doc.title, &text).await?;
        report.generation_calls += 1;
        let fallback_chars = self.processor.settings().overall_fallback_chars;
        let question = overall.question.unwrap_or_else(|| {
            warn!(id = %doc.id, "overall question missing, using fallback");
            format!("{}은(는) 무엇인가요?", doc.title)
        });
        let answer = overall.answer.unwrap_or_else(|| {
            warn!(id = %doc.id, "overall answer missing, using fallback");
            truncate_chars(&text, fallback_chars)
        });
        pairs.push(QaPair { question, answer });
        Ok(pairs)
    }
}

/// Strips a leading question label and caps the length. An empty result
/// falls back to the start of the chunk.
pub fn clean_question(raw: &str, chunk: &str, max_chars: usize) -> String {
    let mut q = raw.trim();
    for label in QUESTION_LABELS {
        if let Some(head) = q.get(..label.len()) {
            if head.eq_ignore_ascii_case(label) {
                q = q[label.len()..].trim_start();
                break;
            }
        }
    }
    let q = q.trim();
    if q.is_empty() {
        return truncate_chars(chunk.trim(), max_chars);
    }
    truncate_chars(q, max_chars)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stripped() {
        assert_eq!(clean_question("질문: 주차는 어디에 하나요?", "c", 120), "주차는 어디에 하나요?");
        assert_eq!(clean_question("question: Where to park?", "c", 120), "Where to park?");
        assert_eq!(clean_question("  Q: 점심은?  ", "c", 120), "점심은?");
    }

    #[test]
    fn long_questions_are_cut_with_ellipsis() {
        let q = clean_question(&"가".repeat(130), "c", 120);
        assert_eq!(q, format!("{}...", "가".repeat(120)));
    }

    #[test]
    fn empty_question_falls_back_to_chunk() {
        assert_eq!(clean_question("  질문:  ", "사내 식당은 2층에 있다.", 120), "사내 식당은 2층에 있다.");
        assert_eq!(clean_question("", &"나".repeat(200), 120), format!("{}...", "나".repeat(120)));
    }
}
