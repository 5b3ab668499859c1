//! Per-document entry cache persisted as a single JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use faqdb_core::error::{Error, Result};
use faqdb_core::types::QaPair;

pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Entries generated for one source document at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version_token: String,
    pub entries: Vec<QaPair>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format_version: u32,
    records: BTreeMap<String, CacheRecord>,
}

/// Records keyed by source-document id, kept in key order so an unchanged
/// cache serializes to identical bytes.
#[derive(Debug)]
pub struct EntryCache {
    path: PathBuf,
    records: BTreeMap<String, CacheRecord>,
}

impl EntryCache {
    /// Reads the cache at `path`. A missing file is an empty cache; an
    /// unreadable or malformed one is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no entry cache yet");
            return Ok(Self { path, records: BTreeMap::new() });
        }
        let raw = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let file: CacheFile = serde_json::from_str(&raw).map_err(|e| Error::json(&path, e))?;
        if file.format_version != CACHE_FORMAT_VERSION {
            return Err(Error::InvalidConfig(format!(
                "entry cache {} has format_version {}, expected {}",
                path.display(),
                file.format_version,
                CACHE_FORMAT_VERSION
            )));
        }
        info!(path = %path.display(), records = file.records.len(), "entry cache loaded");
        Ok(Self { path, records: file.records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CacheRecord> {
        self.records.get(id)
    }

    /// Entries cached for `id` when they were built from `version_token`.
    pub fn lookup(&self, id: &str, version_token: &str) -> Option<&[QaPair]> {
        self.records
            .get(id)
            .filter(|r| r.version_token == version_token)
            .map(|r| r.entries.as_slice())
    }

    pub fn insert(&mut self, id: impl Into<String>, record: CacheRecord) {
        self.records.insert(id.into(), record);
    }

    /// Drops every record whose id is not in `live`; returns how many went.
    pub fn retain_ids<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) -> usize {
        let live: std::collections::HashSet<&str> = live.into_iter().collect();
        let before = self.records.len();
        self.records.retain(|id, _| live.contains(id.as_str()));
        before - self.records.len()
    }

    /// Writes the cache next to its final location and renames it into
    /// place, so readers never see a partial file.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        let file = CacheFile { format_version: CACHE_FORMAT_VERSION, records: self.records.clone() };
        let mut body = serde_json::to_string_pretty(&file).map_err(|e| Error::json(&self.path, e))?;
        body.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
        tmp.write_all(body.as_bytes()).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| Error::io(&self.path, e.error))?;
        debug!(path = %self.path.display(), records = self.records.len(), "entry cache saved");
        Ok(())
    }
}
