//! Directory scanning that feeds raw entries to the classifier.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::app::classify::FilterRules;
use crate::domain::model::RawEntry;
use crate::infra::config::Config;

const CTXBUNDLE_IGNORE: &str = ".ctxbundleignore";

/// Result of scanning a directory root.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub root: PathBuf,
    /// Raw entries in path order, relative to `root` and `/`-separated.
    pub entries: Vec<RawEntry>,
    /// Files skipped for exceeding the size limit.
    pub oversized: Vec<String>,
}

/// Configuration inputs for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    pub globs: Vec<String>,
    pub rules: FilterRules,
}

impl ScannerConfig {
    pub fn from_root(root: PathBuf, config: &Config) -> Self {
        Self {
            root,
            max_file_size: config.scan.max_file_size(),
            respect_gitignore: config.scan.respect_gitignore(),
            include_hidden: config.scan.include_hidden(),
            globs: config.scan.globs.clone(),
            rules: config.filter.clone(),
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

/// Walks a directory tree respecting ignore rules.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    #[tracing::instrument(skip_all, fields(root = %cfg.root.display()))]
    pub fn scan(&self, cfg: &ScannerConfig) -> Result<ScanResult> {
        let matcher = build_ignore_matcher(cfg)?;

        let mut builder = WalkBuilder::new(&cfg.root);
        builder
            .standard_filters(false)
            .git_ignore(cfg.respect_gitignore)
            .git_exclude(cfg.respect_gitignore)
            .require_git(false)
            .hidden(!cfg.include_hidden)
            .add_custom_ignore_filename(CTXBUNDLE_IGNORE)
            .sort_by_file_name(|a, b| a.cmp(b));

        let root = cfg.root.clone();
        let rules = cfg.rules.clone();
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let rel = to_display_path(&root, entry.path());
            !rules.is_ignored_dir(&rel) && !matcher.is_match(&rel)
        });

        let mut result = ScanResult {
            root: cfg.root.clone(),
            ..ScanResult::default()
        };

        for item in builder.build() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "scanner error");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let rel = to_display_path(&cfg.root, path);
            if rel == CTXBUNDLE_IGNORE {
                continue;
            }

            match entry.file_type() {
                Some(kind) if kind.is_dir() => {
                    result.entries.push(RawEntry::directory(format!("{rel}/")));
                    continue;
                }
                Some(kind) if kind.is_file() => {}
                _ => {
                    tracing::debug!(path = %rel, "skipping non-regular file");
                    continue;
                }
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(path = %rel, error = %err, "failed to stat file");
                    continue;
                }
            };
            if metadata.len() > cfg.max_file_size {
                tracing::debug!(path = %rel, size = metadata.len(), "skipping oversized file");
                result.oversized.push(rel);
                continue;
            }

            match fs::read(path) {
                Ok(bytes) => result.entries.push(RawEntry::bytes(rel, bytes)),
                Err(err) => tracing::warn!(path = %rel, error = %err, "failed to read file"),
            }
        }

        Ok(result)
    }
}

fn to_display_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone)]
struct IgnoreMatcher {
    globs: Option<GlobSet>,
}

impl IgnoreMatcher {
    fn is_match(&self, rel: &str) -> bool {
        self.globs.as_ref().is_some_and(|set| set.is_match(rel))
    }
}

fn build_ignore_matcher(cfg: &ScannerConfig) -> Result<IgnoreMatcher> {
    if cfg.globs.is_empty() {
        return Ok(IgnoreMatcher { globs: None });
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in &cfg.globs {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid scan ignore glob")?;
            builder.add(glob);
        }
    }
    let globs = builder.build().context("failed to build ignore matcher")?;
    Ok(IgnoreMatcher { globs: Some(globs) })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}
