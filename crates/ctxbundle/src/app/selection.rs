//! Toggling which entries take part in a bundle.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::domain::model::Entry;

/// Include/exclude glob rules applied to [`Entry::selected`].
///
/// With no include patterns every entry starts selected. Exclusions always win.
#[derive(Debug, Clone, Default)]
pub struct SelectionFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl SelectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from glob patterns, e.g. `src/**` or `*.test.ts`.
    pub fn from_patterns<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: build_set(include).context("invalid include pattern")?,
            exclude: build_set(exclude).context("invalid exclude pattern")?,
        })
    }

    /// Returns whether no pattern was configured.
    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    pub fn is_selected(&self, path: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|set| set.is_match(path));
        let excluded = self.exclude.as_ref().is_some_and(|set| set.is_match(path));
        included && !excluded
    }

    /// Update `selected` on every entry, returning how many remain selected.
    pub fn apply(&self, entries: &mut [Entry]) -> usize {
        let mut selected = 0;
        for entry in entries.iter_mut() {
            entry.selected = self.is_selected(&entry.path);
            if entry.selected {
                selected += 1;
            }
        }
        selected
    }
}

/// Flip the selection state of the entry at `path`. Returns the new state.
pub fn toggle(entries: &mut [Entry], path: &str) -> Option<bool> {
    let entry = entries.iter_mut().find(|entry| entry.path == path)?;
    entry.selected = !entry.selected;
    Some(entry.selected)
}

/// Select or deselect every entry.
pub fn set_all(entries: &mut [Entry], selected: bool) {
    for entry in entries.iter_mut() {
        entry.selected = selected;
    }
}

fn build_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        builder.add(Glob::new(pattern).with_context(|| format!("bad glob '{pattern}'"))?);
    }
    Ok(Some(builder.build()?))
}
