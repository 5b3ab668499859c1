//! Lance-backed embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! The cache is consulted before the embedder runs and written through on
//! misses, so a restart only embeds questions it has never seen.
use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use faqdb_core::traits::Embedder;
use faqdb_core::types::EmbedRole;

use crate::schema::build_cache_schema;
use crate::table::{ensure_table, open_db, table_exists};

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

/// Hash of the role-tagged text. The same question embedded as a document
/// and as a query gets different keys.
pub fn content_hash(role: EmbedRole, text: &str) -> String {
    let tagged = format!("{}\n{}", role.as_str(), text);
    blake3::hash(tagged.as_bytes()).to_hex().to_string()
}

pub struct EmbeddingCache {
    conn: Connection,
    table: String,
    dim: usize,
}

impl EmbeddingCache {
    pub async fn open(uri: &str, table: &str, dim: usize) -> Result<Self> {
        let conn = open_db(uri).await?;
        Ok(Self { conn, table: table.to_string(), dim })
    }

    pub async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        if !table_exists(&self.conn, &self.table).await? {
            return Ok(HashMap::new());
        }
        let wanted: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        let t = self.conn.open_table(&self.table).execute().await?;
        let filter = format!("embedder_id = '{}'", embedder_id.replace('\'', "''"));
        let mut stream = t.query().only_if(filter).execute().await?;
        let mut out = HashMap::new();
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
            let hash_col = batch
                .column_by_name("content_hash")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow!("cache.content_hash column missing"))?;
            let vec_col = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| anyhow!("cache.vector column missing"))?;
            for i in 0..batch.num_rows() {
                let h = hash_col.value(i);
                if !wanted.contains(h) {
                    continue;
                }
                let list = vec_col.value(i);
                let vals: Vec<f32> = list.as_primitive::<arrow_array::types::Float32Type>().values().iter().copied().collect();
                if vals.len() == self.dim {
                    out.insert(h.to_string(), vals);
                }
            }
        }
        Ok(out)
    }

    pub async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        ensure_table(&self.conn, &self.table, build_cache_schema(self.dim)).await?;
        let t = self.conn.open_table(&self.table).execute().await?;

        let mut hashes = Vec::new();
        let mut eids = Vec::new();
        let mut created = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        let now = Utc::now().timestamp_millis();
        for e in entries {
            if e.vector.len() != self.dim {
                return Err(anyhow!("cache vector has {} dims, table expects {}", e.vector.len(), self.dim));
            }
            hashes.push(e.content_hash.clone());
            eids.push(e.embedder_id.clone());
            created.push(now);
            vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
        }
        let schema = build_cache_schema(self.dim);
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(hashes)),
                Arc::new(StringArray::from(eids)),
                Arc::new(TimestampMillisecondArray::from(created)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors.into_iter(),
                    self.dim as i32,
                )),
            ],
        )?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        t.add(reader).execute().await?;
        Ok(())
    }
}

/// Embeds `texts`, serving what it can from `cache` and writing misses back.
///
/// Without a cache, or when the cache cannot be read, every text is embedded.
/// A failed write-through is logged and does not fail the call.
pub async fn embed_with_cache(
    cache: Option<&EmbeddingCache>,
    embedder: &dyn Embedder,
    texts: &[String],
    role: EmbedRole,
) -> Result<Vec<Vec<f32>>> {
    let Some(cache) = cache else {
        return embedder.embed_batch(texts, role);
    };
    let hashes: Vec<String> = texts.iter().map(|t| content_hash(role, t)).collect();
    let hits = match cache.get_many(embedder.embedder_id(), &hashes).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "embedding cache read failed; embedding everything");
            return embedder.embed_batch(texts, role);
        }
    };

    let mut seen = HashSet::new();
    let misses: Vec<usize> = (0..texts.len())
        .filter(|&i| !hits.contains_key(&hashes[i]) && seen.insert(hashes[i].as_str()))
        .collect();
    info!(total = texts.len(), cached = texts.len() - misses.len(), "embedding cache lookup");

    let miss_texts: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
    let fresh = if miss_texts.is_empty() { Vec::new() } else { embedder.embed_batch(&miss_texts, role)? };

    let mut by_hash = hits;
    let mut new_entries = Vec::with_capacity(fresh.len());
    for (&i, v) in misses.iter().zip(fresh) {
        new_entries.push(CacheEntry {
            content_hash: hashes[i].clone(),
            embedder_id: embedder.embedder_id().to_string(),
            vector: v.clone(),
        });
        by_hash.insert(hashes[i].clone(), v);
    }
    if let Err(e) = cache.put_many(&new_entries).await {
        warn!(error = %e, "embedding cache write failed");
    } else if !new_entries.is_empty() {
        debug!(written = new_entries.len(), "embedding cache updated");
    }

    hashes
        .iter()
        .map(|h| by_hash.get(h).cloned().ok_or_else(|| anyhow!("embedding missing for hash {}", h)))
        .collect()
}
