//! Reading and writing the persisted entry set.
//!
//! Entry files are JSON arrays of `{question, answer}` objects. The serving
//! side loads them from configured `(category, pattern)` sources; the corpus
//! builder writes them as numbered shards of bounded size.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::EntrySource;
use crate::error::{Error, Result};
use crate::types::{Entry, QaPair};

/// Load entries from every source in order. Within a source, files are read
/// in natural name order so `x_2.json` precedes `x_10.json`.
pub fn load_entries(base_dir: &Path, sources: &[EntrySource]) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for source in sources {
        let files = match_pattern(base_dir, &source.pattern)?;
        if files.is_empty() {
            warn!(category = %source.category, pattern = %source.pattern, "no entry files matched");
        }
        for path in files {
            let pairs = read_entry_file(&path)?;
            debug!(file = %path.display(), count = pairs.len(), "loaded entry file");
            entries.extend(
                pairs
                    .into_iter()
                    .map(|p| Entry::new(source.category.clone(), p.question, p.answer)),
            );
        }
    }
    info!(count = entries.len(), sources = sources.len(), "entry set loaded");
    Ok(entries)
}

pub fn read_entry_file(path: &Path) -> Result<Vec<QaPair>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| Error::json(path, e))
}

/// Write `entries` as `{base}_{n}.json` shards (1-based) of at most
/// `max_per_file` entries and remove higher-numbered shards left over from
/// an earlier, larger run. Returns the written paths in order.
pub fn write_shards(
    dir: &Path,
    base_name: &str,
    max_per_file: usize,
    entries: &[Entry],
) -> Result<Vec<PathBuf>> {
    if max_per_file == 0 {
        return Err(Error::InvalidConfig("max entries per file must be >= 1".into()));
    }
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let mut written = Vec::new();
    for (i, slice) in entries.chunks(max_per_file).enumerate() {
        let path = dir.join(format!("{}_{}.json", base_name, i + 1));
        let pairs: Vec<QaPair> = slice.iter().map(QaPair::from).collect();
        let mut json = serde_json::to_string_pretty(&pairs).map_err(|e| Error::json(&path, e))?;
        json.push('\n');
        fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
        info!(file = %path.display(), count = slice.len(), "wrote entry shard");
        written.push(path);
    }
    remove_stale_shards(dir, base_name, written.len())?;
    Ok(written)
}

fn remove_stale_shards(dir: &Path, base_name: &str, keep: usize) -> Result<()> {
    let prefix = format!("{}_", base_name);
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Operation(format!("listing {}: {}", dir.display(), e)))?;
        let Some(name) = entry.file_name().to_str() else { continue };
        let Some(n) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
            .and_then(|num| num.parse::<usize>().ok())
        else {
            continue;
        };
        if n > keep {
            fs::remove_file(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            info!(file = %entry.path().display(), "removed stale entry shard");
        }
    }
    Ok(())
}

/// Files under `base_dir` matching `pattern`. Only the file-name part may
/// contain a `*`; a pattern without one names a single (optional) file.
pub fn match_pattern(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let rel = Path::new(pattern);
    let dir = match rel.parent() {
        Some(parent) => base_dir.join(parent),
        None => base_dir.to_path_buf(),
    };
    let file_pattern = rel
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| Error::InvalidConfig(format!("entry source pattern '{}' has no file name", pattern)))?;

    if !file_pattern.contains('*') {
        let path = dir.join(file_pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let (head, tail) = file_pattern.split_once('*').unwrap_or((file_pattern, ""));
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Operation(format!("listing {}: {}", dir.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else { continue };
        if name.len() >= head.len() + tail.len() && name.starts_with(head) && name.ends_with(tail) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(files)
}

fn file_name(p: &Path) -> String {
    p.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Compares names treating runs of ASCII digits as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na = take_number(&mut a);
                let nb = take_number(&mut b);
                match na.cmp(&nb) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                match x.cmp(&y) {
                    Ordering::Equal => {}
                    other => return other,
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u128 {
    let mut n: u128 = 0;
    while let Some(d) = it.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(u128::from(d));
        it.next();
    }
    n
}
