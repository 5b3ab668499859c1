//! Source stores the corpus builder reads from.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use faqdb_core::traits::SourceStore;
use faqdb_core::types::SourceDocument;

/// Every `.txt` and `.md` file under a directory, in path order.
///
/// The id is the path relative to the root (with `/` separators), the
/// title is the file stem and the version token is the blake3 hash of
/// the content.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn is_document(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
            Some("txt") | Some("md")
        )
    }
}

impl SourceStore for DirectorySource {
    fn list(&self) -> Result<Vec<SourceDocument>> {
        let mut docs = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", self.root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_document(path) {
                continue;
            }
            let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            let id = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
            let title = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| id.clone());
            let version_token = blake3::hash(content.as_bytes()).to_hex().to_string();
            debug!(%id, chars = content.chars().count(), "source document");
            docs.push(SourceDocument { id, title, content, version_token });
        }
        info!(root = %self.root.display(), documents = docs.len(), "directory source listed");
        Ok(docs)
    }
}

#[derive(Debug, Deserialize)]
struct WikiRow {
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    updated_at: Value,
    #[serde(default)]
    is_deleted: Value,
}

/// A JSON export of the wiki table: an array of
/// `{id, title, content, updated_at, is_deleted}` rows.
///
/// Deleted rows are dropped and a null title or content reads as empty.
/// The version token is `updated_at`, so an edit
/// that does not bump it is not picked up.
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceStore for ManifestSource {
    fn list(&self) -> Result<Vec<SourceDocument>> {
        let raw = fs::read_to_string(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let rows: Vec<WikiRow> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))?;
        let total = rows.len();
        let docs: Vec<SourceDocument> = rows
            .into_iter()
            .filter(|r| !is_truthy(&r.is_deleted))
            .map(|r| SourceDocument {
                id: scalar_to_string(&r.id),
                title: r.title.unwrap_or_default(),
                content: r.content.unwrap_or_default(),
                version_token: scalar_to_string(&r.updated_at),
            })
            .collect();
        info!(manifest = %self.path.display(), rows = total, documents = docs.len(), "manifest source listed");
        Ok(docs)
    }
}

/// Database exports spell booleans as `true`, `1`, `"1"`, `"Y"` and so on.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "y" | "yes"),
        _ => false,
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deleted_flag_spellings() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("Y")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("N")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn numeric_ids_become_strings() {
        assert_eq!(scalar_to_string(&json!(42)), "42");
        assert_eq!(scalar_to_string(&json!("2024-05-01 10:00:00")), "2024-05-01 10:00:00");
    }
}
