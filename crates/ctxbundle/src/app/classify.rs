//! Eligibility filtering and language classification of raw entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CodecError;
use crate::domain::model::{Entry, RawContent, RawEntry};

/// Tag assigned to files whose extension has no mapping.
pub const FALLBACK_LANGUAGE: &str = "text";

/// Why a raw entry was left out of the eligible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Directory,
    IgnoredDirectory,
    IgnoredFile,
    Binary,
    Undecodable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Directory => "directory",
            SkipReason::IgnoredDirectory => "ignored directory",
            SkipReason::IgnoredFile => "ignored file",
            SkipReason::Binary => "binary",
            SkipReason::Undecodable => "not utf-8",
        }
    }
}

/// Ignore lists consulted before an entry is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Directory names excluded wherever they appear as a path segment.
    #[serde(default)]
    pub ignored_dirs: Vec<String>,
    /// Basenames excluded regardless of directory.
    #[serde(default)]
    pub ignored_files: Vec<String>,
    /// Suffixes (with the leading dot) treated as binary.
    #[serde(default)]
    pub binary_extensions: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            ignored_dirs: to_strings(&[
                "node_modules",
                ".git",
                "dist",
                "build",
                ".next",
                ".cache",
                "vendor",
                "__pycache__",
                "env",
                "venv",
                ".expo",
                ".vercel",
            ]),
            ignored_files: to_strings(&[
                ".DS_Store",
                "package-lock.json",
                "yarn.lock",
                "pnpm-lock.yaml",
                ".env.local",
                "thumbs.db",
            ]),
            binary_extensions: to_strings(&[
                ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".pdf", ".zip", ".exe", ".dll",
                ".woff", ".woff2",
            ]),
        }
    }
}

impl FilterRules {
    /// True when any segment of `path` is an ignored directory name.
    pub fn is_ignored_dir(&self, path: &str) -> bool {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.ignored_dirs.iter().any(|dir| dir == segment))
    }

    pub fn is_ignored_file(&self, path: &str) -> bool {
        let name = basename(path);
        self.ignored_files
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(name))
    }

    pub fn has_binary_extension(&self, path: &str) -> bool {
        let lowered = path.to_ascii_lowercase();
        self.binary_extensions
            .iter()
            .any(|ext| lowered.ends_with(&ext.to_ascii_lowercase()))
    }
}

/// Extension to language tag lookup. Tags are labels only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(BTreeMap<String, String>);

impl Default for LanguageMap {
    fn default() -> Self {
        let pairs = [
            ("js", "javascript"),
            ("ts", "typescript"),
            ("tsx", "typescript-react"),
            ("jsx", "javascript-react"),
            ("py", "python"),
            ("java", "java"),
            ("go", "go"),
            ("rs", "rust"),
            ("rb", "ruby"),
            ("php", "php"),
            ("html", "html"),
            ("css", "css"),
            ("json", "json"),
            ("yaml", "yaml"),
            ("md", "markdown"),
        ];
        Self(
            pairs
                .into_iter()
                .map(|(ext, tag)| (ext.to_owned(), tag.to_owned()))
                .collect(),
        )
    }
}

impl LanguageMap {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    /// Add or replace mappings, keys compared case-insensitively.
    pub fn extend(&mut self, other: LanguageMap) {
        for (ext, tag) in other.0 {
            self.0.insert(ext.to_ascii_lowercase(), tag);
        }
    }

    pub fn language_for(&self, path: &str) -> &str {
        extension(path)
            .and_then(|ext| self.0.get(&ext.to_ascii_lowercase()))
            .map(String::as_str)
            .unwrap_or(FALLBACK_LANGUAGE)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// Entries accepted and rejected by [`Classifier::classify_all`], in input order.
#[derive(Debug, Default)]
pub struct Classified {
    pub entries: Vec<Entry>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Turns raw extracted items into bundle-ready entries.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: FilterRules,
    languages: LanguageMap,
}

impl Classifier {
    pub fn new(rules: FilterRules, languages: LanguageMap) -> Self {
        Self { rules, languages }
    }

    pub fn rules(&self) -> &FilterRules {
        &self.rules
    }

    pub fn languages(&self) -> &LanguageMap {
        &self.languages
    }

    /// Accept or reject a single raw entry.
    pub fn classify(&self, raw: RawEntry) -> Option<Entry> {
        self.inspect(raw).ok()
    }

    /// Like [`Classifier::classify`], but reports the exclusion reason.
    pub fn inspect(&self, raw: RawEntry) -> Result<Entry, SkipReason> {
        if raw.is_dir {
            return Err(SkipReason::Directory);
        }
        if self.rules.is_ignored_dir(&raw.path) {
            return Err(SkipReason::IgnoredDirectory);
        }
        if self.rules.is_ignored_file(&raw.path) {
            return Err(SkipReason::IgnoredFile);
        }
        if self.rules.has_binary_extension(&raw.path) {
            return Err(SkipReason::Binary);
        }

        let content = match decode(&raw.path, raw.content) {
            Ok(Some(text)) => text,
            Ok(None) => return Err(SkipReason::Binary),
            Err(err) => {
                tracing::debug!(error = %err, "treating undecodable entry as binary");
                return Err(SkipReason::Undecodable);
            }
        };

        let language = self.languages.language_for(&raw.path).to_owned();
        Ok(Entry::new(raw.path, content, language))
    }

    /// Classify a batch, keeping the order of accepted entries.
    pub fn classify_all<I>(&self, raws: I) -> Classified
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let mut classified = Classified::default();
        for raw in raws {
            let path = raw.path.clone();
            match self.inspect(raw) {
                Ok(entry) => classified.entries.push(entry),
                Err(reason) => {
                    tracing::trace!(%path, reason = reason.as_str(), "skipped entry");
                    classified.skipped.push((path, reason));
                }
            }
        }
        classified
    }
}

fn decode(path: &str, content: RawContent) -> Result<Option<String>, CodecError> {
    match content {
        RawContent::Text(text) => Ok(Some(text)),
        RawContent::Binary => Ok(None),
        RawContent::Bytes(bytes) => String::from_utf8(bytes).map(Some).map_err(|_| {
            CodecError::Decode {
                path: path.to_owned(),
            }
        }),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}
