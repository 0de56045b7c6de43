//! Domain models for entries, bundles, and reconstructed sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::tokens::{count_lines, estimate_tokens};

/// Content of an entry as handed over by the extraction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    /// Already decoded text.
    Text(String),
    /// Undecoded bytes; decoding happens during classification.
    Bytes(Vec<u8>),
    /// The extractor already knows the payload is not text.
    Binary,
}

/// One item discovered in a source archive or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub path: String,
    pub content: RawContent,
    pub is_dir: bool,
}

impl RawEntry {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: RawContent::Text(content.into()),
            is_dir: false,
        }
    }

    pub fn bytes(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content: RawContent::Bytes(bytes),
            is_dir: false,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: RawContent::Binary,
            is_dir: true,
        }
    }
}

/// A text file eligible for bundling, with derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Relative, `/`-separated path.
    pub path: String,
    pub content: String,
    /// Content length in bytes.
    pub size: u64,
    pub language: String,
    pub lines: usize,
    pub tokens: usize,
    pub selected: bool,
}

impl Entry {
    /// Build a selected entry, deriving size, line and token counts from `content`.
    pub fn new(path: impl Into<String>, content: impl Into<String>, language: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            lines: count_lines(&content),
            tokens: estimate_tokens(&content),
            language: language.into(),
            content,
            selected: true,
        }
    }
}

/// Aggregate statistics of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub languages: BTreeMap<String, usize>,
    pub total_lines: usize,
}

/// Output of a bundling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResult {
    pub total_files: usize,
    pub total_size: u64,
    /// Heuristic token estimate of `bundle_text`, not a per-file sum.
    pub total_tokens: usize,
    pub bundle_text: String,
    pub tree: String,
    pub stats: BundleStats,
}

/// A file recovered from a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSection {
    pub path: String,
    pub content: String,
}

impl ParsedSection {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}
