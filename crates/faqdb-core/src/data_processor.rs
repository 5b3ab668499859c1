//! Splits long source text into bounded chunks, one per generated entry.
//!
//! Paragraphs are separated by blank lines. A paragraph over
//! `paragraph_max_chars` is cut into sentences, and sentences are packed
//! greedily into groups that stay under `buffer_max_chars`. All lengths are
//! counted in characters.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::ChunkingSettings;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex is valid"));

#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    chunking: ChunkingSettings,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingSettings) -> Self {
        Self { chunking }
    }

    pub fn settings(&self) -> &ChunkingSettings {
        &self.chunking
    }

    /// Ordered chunks of `text`. Chunk order follows the text and each chunk
    /// later becomes an answer verbatim.
    pub fn split_to_chunks(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for paragraph in split_paragraphs(text) {
            if char_len(paragraph) > self.chunking.paragraph_max_chars {
                chunks.extend(self.group_sentences(paragraph));
            } else {
                chunks.push(paragraph.to_string());
            }
        }
        chunks
    }

    fn group_sentences(&self, paragraph: &str) -> Vec<String> {
        let cap = self.chunking.buffer_max_chars;
        let mut groups = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;
        for sentence in split_sentences(paragraph, &self.chunking.sentence_terminators) {
            let n = char_len(sentence);
            if buffer_len + n < cap {
                buffer.push_str(sentence);
                buffer.push(' ');
                buffer_len += n + 1;
                continue;
            }
            // A sentence at or over the cap gets a group of its own.
            let flushed = buffer.trim();
            if !flushed.is_empty() {
                groups.push(flushed.to_string());
            }
            buffer.clear();
            buffer.push_str(sentence);
            buffer.push(' ');
            buffer_len = n + 1;
        }
        let rest = buffer.trim();
        if !rest.is_empty() {
            groups.push(rest.to_string());
        }
        groups
    }
}

pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text.trim())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Splits at every whitespace run that directly follows a terminator. The
/// terminator stays with its sentence; the whitespace is dropped.
pub fn split_sentences<'a>(paragraph: &'a str, terminators: &str) -> Vec<&'a str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && prev.is_some_and(|p| terminators.contains(p)) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = j + w.len_utf8();
                chars.next();
            }
            if start < i {
                sentences.push(&paragraph[start..i]);
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    if start < paragraph.len() {
        sentences.push(&paragraph[start..]);
    }
    sentences
}

/// First `max` characters of `s`, with `...` appended when anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
