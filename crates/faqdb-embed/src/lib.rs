//! faqdb-embed
//!
//! Local instruction-tuned sentence embeddings (multilingual-e5-large-instruct,
//! an XLM-RoBERTa encoder) on candle, plus a hashing embedder for tests.
//! Set `APP_USE_FAKE_EMBEDDINGS=1` to skip loading the model.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use faqdb_core::config::EmbeddingSettings;
use faqdb_core::traits::Embedder;
use faqdb_core::types::EmbedRole;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const DEFAULT_MODEL_DIR: &str = "models/multilingual-e5-large-instruct";

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
    document_instruction: String,
    query_instruction: String,
}

impl EmbeddingModel {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let device = device::select_device();
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let dtype = DType::F32;
        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while the model is alive.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, &device)? }
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            let weights = candle_core::pickle::read_all(&weights_path)?;
            let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, dtype, &device)
        };
        let model = XLMRobertaModel::new(&config, vb)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "e5".to_string());
        let id = format!("local:{}:d{}", name, settings.dim);
        info!(%id, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            id,
            dim: settings.dim,
            max_len: settings.max_len,
            document_instruction: settings.document_instruction.clone(),
            query_instruction: settings.query_instruction.clone(),
        })
    }

    fn instruction(&self, role: EmbedRole) -> &str {
        match role {
            EmbedRole::Document => &self.document_instruction,
            EmbedRole::Query => &self.query_instruction,
        }
    }

    pub fn embed_text(&self, text: &str, role: EmbedRole) -> Result<Vec<f32>> {
        let start = Instant::now();
        let framed = format!("{}{}", self.instruction(role), text);
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, &framed, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?.to_dtype(DType::I64)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if v.len() != self.dim {
            return Err(anyhow!("model produced {}-d vectors but embedding.dim is {}", v.len(), self.dim));
        }
        let elapsed = start.elapsed().as_millis();
        if elapsed > 500 { warn!(elapsed_ms = elapsed, role = role.as_str(), "slow embedding"); }
        Ok(v)
    }
}

impl Embedder for EmbeddingModel {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t, role)).collect()
    }
}

/// Deterministic bag-of-tokens hashing embedder. Identical texts embed
/// identically regardless of role, texts sharing tokens land close together.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:d{}", dim) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 1.0 + val;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake {
        debug!(dim = settings.dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dim)));
    }
    Ok(Box::new(EmbeddingModel::new(settings)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = faqdb_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("embedding.model_dir {} does not exist", p.display()));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { debug!(var, dir = %p.display(), "model dir from env"); return Ok(p); }
        }
    }
    let parent = Path::new("..").join(DEFAULT_MODEL_DIR);
    if parent.exists() { return Ok(parent); }
    let local = Path::new(DEFAULT_MODEL_DIR);
    if local.exists() { return Ok(local.to_path_buf()); }
    Err(anyhow!("Could not locate the multilingual-e5-large-instruct model directory"))
}
