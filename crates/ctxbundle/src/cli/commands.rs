//! Command handlers wiring the codec to the filesystem.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use clap_complete::Shell;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::app::classify::Classified;
use crate::app::export::{BundleOptions, Bundler, suggested_file_name};
use crate::app::reverse::{ReverseOptions, ReverseParser};
use crate::app::scan::{Scanner, ScannerConfig};
use crate::app::selection::SelectionFilter;
use crate::app::tokens::{TokenCounter, TokenModel};
use crate::app::tree::build_tree;
use crate::cli::{BundleArgs, Cli, ReverseArgs, SelectionArgs, TreeArgs};
use crate::domain::model::{BundleResult, Entry};
use crate::infra::config::Config;
use crate::infra::fs::write_sections;

const DEFAULT_PROJECT_NAME: &str = "project";

pub(super) fn bundle(args: BundleArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let entries = load_entries(&args.dir, &args.selection, &config)?;

    let options = BundleOptions::new(
        args.format.unwrap_or_else(|| config.defaults.format()),
        args.template.unwrap_or_else(|| config.defaults.template()),
        args.name.clone().unwrap_or_else(|| project_name(&args.dir)),
    );
    let bundler = Bundler::with_preambles(config.preambles())?;
    let result = bundler.bundle(&entries, &options)?;

    match &args.output {
        Some(target) => {
            let path = if target.is_dir() {
                target.join(suggested_file_name(options.format, &options.archive_name))
            } else {
                target.clone()
            };
            fs::write(&path, &result.bundle_text)
                .with_context(|| format!("failed to write bundle to {}", path.display()))?;
            tracing::info!(path = %path.display(), "bundle written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(result.bundle_text.as_bytes())
                .context("failed to write bundle to stdout")?;
            stdout.flush()?;
        }
    }

    if args.stats {
        let counter = TokenCounter::new(args.tokenizer.unwrap_or_else(|| config.defaults.tokenizer()));
        eprint!("{}", render_stats(&result, &counter));
    }
    Ok(())
}

pub(super) fn reverse(args: ReverseArgs) -> Result<()> {
    let text = read_input(args.input.as_deref())?;
    let parser = ReverseParser::with_options(ReverseOptions {
        trim_content: !args.exact,
    });
    let outcome = parser.parse_detailed(&text)?;

    if args.dry_run {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "format: {}", outcome.format.as_str())?;
        for section in &outcome.sections {
            writeln!(stdout, "{} ({} bytes)", section.path, section.content.len())?;
        }
        return Ok(());
    }

    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => default_output_dir()?,
    };
    let written = write_sections(&out_dir, &outcome.sections)?;
    eprintln!(
        "Recovered {} file(s) from {} bundle into {}",
        written.len(),
        outcome.format.as_str(),
        out_dir.display()
    );
    Ok(())
}

pub(super) fn tree(args: TreeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let entries = load_entries(&args.dir, &args.selection, &config)?;
    let rendered = build_tree(
        entries
            .iter()
            .filter(|entry| entry.selected)
            .map(|entry| entry.path.as_str()),
    );
    print!("{rendered}");
    Ok(())
}

pub(super) fn completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "ctxbundle", &mut io::stdout());
    Ok(())
}

fn load_entries(dir: &Path, selection: &SelectionArgs, config: &Config) -> Result<Vec<Entry>> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    let scan = Scanner::new()
        .scan(&ScannerConfig::from_root(dir.to_path_buf(), config))
        .with_context(|| format!("failed to scan {}", dir.display()))?;
    for path in &scan.oversized {
        tracing::warn!(%path, "skipping file above size limit");
    }

    let Classified { mut entries, skipped } = config.classifier().classify_all(scan.entries);
    for (path, reason) in &skipped {
        tracing::debug!(%path, reason = reason.as_str(), "excluded");
    }

    let filter = SelectionFilter::from_patterns(&selection.include, &selection.exclude)?;
    let selected = filter.apply(&mut entries);
    if selected == 0 {
        bail!("no files selected in {}", dir.display());
    }
    tracing::info!(eligible = entries.len(), selected, "files discovered");
    Ok(entries)
}

fn project_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_owned())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read bundle from {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read bundle from stdin")?;
            Ok(text)
        }
    }
}

fn default_output_dir() -> Result<PathBuf> {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .context("failed to format output directory timestamp")?;
    Ok(PathBuf::from(format!("reconstructed_project_{stamp}")))
}

fn render_stats(result: &BundleResult, counter: &TokenCounter) -> String {
    let mut report = format!(
        "files: {}\nsize: {} bytes\nlines: {}\ntokens (estimate): {}\n",
        result.total_files, result.total_size, result.stats.total_lines, result.total_tokens
    );
    if counter.model() != TokenModel::Heuristic {
        report.push_str(&format!(
            "tokens ({}): {}\n",
            counter.model(),
            counter.count(&result.bundle_text)
        ));
    }
    for (language, count) in &result.stats.languages {
        report.push_str(&format!("  {language}: {count}\n"));
    }
    report
}
