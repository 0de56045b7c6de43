//! Materializing reconstructed sections on disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::domain::model::ParsedSection;

/// Resolve a section path below `root`, rejecting anything that could escape it.
pub fn resolve_section_path(root: &Path, section_path: &str) -> Result<PathBuf> {
    let relative = Path::new(section_path);
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("refusing to write outside the output directory: {section_path}");
            }
        }
    }

    if depth == 0 {
        bail!("section path is empty: '{section_path}'");
    }
    Ok(resolved)
}

/// Write every section below `root`, creating directories as needed.
///
/// Later sections overwrite earlier ones with the same path. Returns the written
/// paths in section order.
#[tracing::instrument(skip_all, fields(root = %root.display(), sections = sections.len()))]
pub fn write_sections(root: &Path, sections: &[ParsedSection]) -> Result<Vec<PathBuf>> {
    let targets = sections
        .iter()
        .map(|section| resolve_section_path(root, &section.path))
        .collect::<Result<Vec<_>>>()?;
    check_layout(root, &targets)?;

    let mut written = Vec::with_capacity(sections.len());
    for (section, target) in sections.iter().zip(targets) {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&target, &section.content)
            .with_context(|| format!("failed to write {}", target.display()))?;
        tracing::trace!(path = %target.display(), "wrote section");
        written.push(target);
    }
    Ok(written)
}

/// Reject layouts where one path would have to be both a file and a directory,
/// either among the sections themselves or against what already exists on disk.
fn check_layout(root: &Path, targets: &[PathBuf]) -> Result<()> {
    let files: HashSet<&Path> = targets.iter().map(PathBuf::as_path).collect();
    for target in targets {
        if target.is_dir() {
            bail!("cannot write {}: a directory already exists there", target.display());
        }
        for ancestor in target.ancestors().skip(1) {
            if ancestor == root {
                break;
            }
            if files.contains(ancestor) {
                bail!(
                    "{} would be both a file and a directory",
                    ancestor.display()
                );
            }
            if ancestor.is_file() {
                bail!(
                    "cannot create directory {}: a file already exists there",
                    ancestor.display()
                );
            }
        }
    }
    Ok(())
}
