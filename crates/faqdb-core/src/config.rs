//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (nested keys split on `__`, so
//! `APP_RETRIEVAL__TOP_K=5` sets `retrieval.top_k`). Every threshold the
//! matchers and the corpus builder use is a named value here.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment, env_name: impl Into<String>) -> anyhow::Result<Self> {
        let config = Self { figment, env_name: env_name.into() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        match self.env_name.as_str() {
            "prod" | "production" => {
                if settings.generation.min_call_spacing_ms == 0 {
                    anyhow::bail!(
                        "generation.min_call_spacing_ms must be > 0 in production (provider rate limit)"
                    );
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    /// Ordered `(surface form, canonical form)` pairs. Written as an array
    /// of pairs in TOML because a table would lose the order.
    pub synonyms: Vec<(String, String)>,
    /// Exact trimmed question → literal answer, bypassing retrieval.
    pub quick_answers: BTreeMap<String, String>,
    pub corpus: CorpusSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be >= 1".into()));
        }
        if !(r.overlap_ratio > 0.0 && r.overlap_ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.overlap_ratio must be in (0, 1], got {}",
                r.overlap_ratio
            )));
        }
        if !(-1.0..=1.0).contains(&r.similarity_floor) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.similarity_floor must be in [-1, 1], got {}",
                r.similarity_floor
            )));
        }
        if r.overlap_score > r.exact_score {
            return Err(Error::InvalidConfig(
                "retrieval.overlap_score must not exceed retrieval.exact_score".into(),
            ));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be >= 1".into()));
        }
        if self.corpus.max_entries_per_file == 0 {
            return Err(Error::InvalidConfig("corpus.max_entries_per_file must be >= 1".into()));
        }
        let c = &self.chunking;
        if c.buffer_max_chars == 0 || c.question_max_chars == 0 {
            return Err(Error::InvalidConfig(
                "chunking.buffer_max_chars and chunking.question_max_chars must be >= 1".into(),
            ));
        }
        if c.buffer_max_chars > c.paragraph_max_chars {
            return Err(Error::InvalidConfig(format!(
                "chunking.buffer_max_chars ({}) exceeds chunking.paragraph_max_chars ({})",
                c.buffer_max_chars, c.paragraph_max_chars
            )));
        }
        for (from, _) in &self.synonyms {
            if from.is_empty() {
                return Err(Error::InvalidConfig("synonyms must not contain an empty key".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Vector candidates returned per query.
    pub top_k: usize,
    /// Best vector similarity below this flags the selection low-confidence.
    pub similarity_floor: f32,
    /// Minimum `|shared| / |candidate tokens|` for a token-overlap match.
    pub overlap_ratio: f32,
    /// Minimum shared tokens for a token-overlap match.
    pub min_overlap: usize,
    /// Minimum distinct tokens a candidate question needs to be eligible.
    pub min_candidate_tokens: usize,
    /// Tokens shorter than this (in characters) are ignored.
    pub min_token_chars: usize,
    /// Characters stripped from the end of every token (Korean particles).
    pub particles: String,
    pub exact_score: f32,
    pub overlap_score: f32,
    pub embed_timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_floor: 0.4,
            overlap_ratio: 0.7,
            min_overlap: 2,
            min_candidate_tokens: 2,
            min_token_chars: 2,
            particles: "은는이가을를에서의".to_string(),
            exact_score: 1.0,
            overlap_score: 0.95,
            embed_timeout_ms: 10_000,
        }
    }
}

/// One `(category, file pattern)` pair of the serving-side entry set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySource {
    pub category: String,
    /// Path relative to `corpus.dir`; the file name may contain one `*`.
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Directory holding entry files; generated shards are written here too.
    pub dir: String,
    /// Sources in priority order. Earlier sources win keyword ties.
    pub sources: Vec<EntrySource>,
    pub output_base_name: String,
    pub max_entries_per_file: usize,
    pub cache_path: String,
    /// Category given to generated entries.
    pub category: String,
    /// Directory of `.txt`/`.md` source documents.
    pub source_dir: Option<String>,
    /// JSON export of the wiki table; takes precedence over `source_dir`.
    pub manifest: Option<String>,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            dir: "company_FAQ".to_string(),
            sources: vec![EntrySource {
                category: "wiki".to_string(),
                pattern: "converted_faq_*.json".to_string(),
            }],
            output_base_name: "converted_faq".to_string(),
            max_entries_per_file: 500,
            cache_path: "company_FAQ/.entry_cache.json".to_string(),
            category: "wiki".to_string(),
            source_dir: None,
            manifest: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Paragraphs longer than this are split into sentence groups.
    pub paragraph_max_chars: usize,
    /// Soft cap of a sentence group.
    pub buffer_max_chars: usize,
    /// Generated questions longer than this are cut and suffixed with `...`.
    pub question_max_chars: usize,
    /// Length of the source excerpt used when a summary answer is missing.
    pub overall_fallback_chars: usize,
    /// Characters that end a sentence when followed by whitespace.
    pub sentence_terminators: String,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            paragraph_max_chars: 300,
            buffer_max_chars: 250,
            question_max_chars: 120,
            overall_fallback_chars: 300,
            sentence_terminators: ".!?".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
    /// Prefix for indexed FAQ questions.
    pub document_instruction: String,
    /// Prefix for incoming user queries.
    pub query_instruction: String,
    /// LanceDB directory for cached question vectors; unset disables caching.
    pub cache_db: Option<String>,
    pub cache_table: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            dim: 1024,
            max_len: 512,
            document_instruction:
                "Instruct: Retrieve semantically similar company FAQ questions\nQuery: ".to_string(),
            query_instruction:
                "Instruct: Given a user question, retrieve the most relevant company FAQ question\nQuery: "
                    .to_string(),
            cache_db: None,
            cache_table: "question_embeddings".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the env var holding the API key (never the key itself).
    pub api_key_env: String,
    pub timeout_ms: u64,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Minimum spacing between corpus-build generation calls.
    pub min_call_spacing_ms: u64,
    /// Assistant name used in the answer prompt.
    pub assistant_name: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "models/gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 1_000,
            min_call_spacing_ms: 7_000,
            assistant_name: "yobuddy".to_string(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
