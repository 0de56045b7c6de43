//! Reconstruction of files from a bundle of unknown format.
//!
//! Formats are detected by trying each strategy in turn: text delimiters, then
//! JSON, then markdown headings. The first strategy that yields at least one
//! section wins; results are never merged across strategies.
//!
//! Two limitations are inherent to the line-delimited formats. A content line
//! made of exactly 80 `=` characters ends a text section early, and a content line
//! of exactly three backticks ends a markdown section early.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::app::export::{BundleFormat, FILE_DELIMITER};
use crate::domain::errors::CodecError;
use crate::domain::model::ParsedSection;

static TEXT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^={80}\nFILE: ([^\n]*)\n={80}\n\n").expect("text header pattern is valid")
});

static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^### File: ([^\n]*)\n(?:[ \t]*\n)*```[^\n`]*\n")
        .expect("markdown header pattern is valid")
});

const FENCE: &str = "```";

/// Options controlling how recovered content is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseOptions {
    /// Strip leading and trailing whitespace from text and markdown sections.
    ///
    /// Enabled by default. This loses meaningful surrounding blank lines; disable
    /// it to recover content exactly as the serializer wrote it.
    pub trim_content: bool,
}

impl Default for ReverseOptions {
    fn default() -> Self {
        Self { trim_content: true }
    }
}

/// Sections recovered from a bundle together with the detected format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub format: BundleFormat,
    pub sections: Vec<ParsedSection>,
}

type Strategy = fn(&str, &ReverseOptions) -> Option<Vec<ParsedSection>>;

const STRATEGIES: [(BundleFormat, Strategy); 3] = [
    (BundleFormat::Text, text_sections),
    (BundleFormat::Json, json_sections),
    (BundleFormat::Markdown, markdown_sections),
];

/// Detects the bundle format and extracts its files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseParser {
    options: ReverseOptions,
}

impl ReverseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReverseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ReverseOptions {
        self.options
    }

    /// Recover sections in document order.
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedSection>, CodecError> {
        self.parse_detailed(text).map(|outcome| outcome.sections)
    }

    /// Recover sections and report which format matched.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn parse_detailed(&self, text: &str) -> Result<ParseOutcome, CodecError> {
        for (format, strategy) in STRATEGIES {
            if let Some(sections) = strategy(text, &self.options) {
                tracing::debug!(
                    format = format.as_str(),
                    sections = sections.len(),
                    "bundle format detected"
                );
                return Ok(ParseOutcome { format, sections });
            }
            tracing::trace!(format = format.as_str(), "strategy found no sections");
        }
        Err(CodecError::NoSectionsFound)
    }
}

/// Parse with default options.
pub fn parse(text: &str) -> Result<Vec<ParsedSection>, CodecError> {
    ReverseParser::new().parse(text)
}

fn text_sections(text: &str, options: &ReverseOptions) -> Option<Vec<ParsedSection>> {
    let mut sections = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = TEXT_HEADER.captures_at(text, cursor) {
        let (Some(header), Some(path)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let body_start = header.end();
        let body_end = find_line(text, body_start, FILE_DELIMITER).unwrap_or(text.len());
        let raw = &text[body_start..body_end];

        let content = if options.trim_content {
            raw.trim()
        } else if body_end == text.len() {
            // The serializer terminates every section with one newline.
            raw.strip_suffix('\n').unwrap_or(raw)
        } else {
            raw
        };
        push_section(&mut sections, path.as_str(), content);
        cursor = body_end;
    }

    non_empty(sections)
}

fn json_sections(text: &str, _options: &ReverseOptions) -> Option<Vec<ParsedSection>> {
    let whole = text.trim();
    let mut candidates = vec![whole];
    // A preamble may precede the single-line JSON document.
    if let Some(last_line) = whole.rsplit('\n').next()
        && last_line.len() != whole.len()
    {
        candidates.push(last_line.trim());
    }

    for candidate in candidates {
        match decode_json(candidate) {
            Ok(sections) if !sections.is_empty() => return Some(sections),
            Ok(_) => {}
            Err(err) => tracing::trace!(error = %err, "input is not a JSON bundle"),
        }
    }
    None
}

#[derive(Deserialize)]
struct JsonDocument {
    files: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct JsonSection {
    #[serde(alias = "p")]
    path: String,
    #[serde(alias = "c")]
    content: String,
}

fn decode_json(candidate: &str) -> Result<Vec<ParsedSection>, CodecError> {
    let document: JsonDocument = serde_json::from_str(candidate)?;
    let mut sections = Vec::with_capacity(document.files.len());
    for file in document.files {
        match serde_json::from_value::<JsonSection>(file) {
            Ok(section) => sections.push(ParsedSection::new(section.path, section.content)),
            Err(err) => tracing::debug!(error = %err, "skipping malformed JSON file entry"),
        }
    }
    Ok(sections)
}

fn markdown_sections(text: &str, options: &ReverseOptions) -> Option<Vec<ParsedSection>> {
    let mut sections = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = MARKDOWN_HEADER.captures_at(text, cursor) {
        let (Some(header), Some(path)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let body_start = header.end();
        let body_end = if is_line_at(text, body_start, FENCE) {
            Some(body_start)
        } else {
            find_line(text, body_start, FENCE)
        };

        let Some(body_end) = body_end else {
            tracing::debug!(path = path.as_str().trim(), "unterminated code fence");
            cursor = body_start;
            continue;
        };

        let raw = &text[body_start..body_end];
        let content = if options.trim_content { raw.trim() } else { raw };
        push_section(&mut sections, path.as_str(), content);
        cursor = body_end;
    }

    non_empty(sections)
}

/// Index of the newline preceding the first line after `from` that equals `line`.
fn find_line(text: &str, from: usize, line: &str) -> Option<usize> {
    let mut cursor = from;
    while let Some(offset) = text[cursor..].find('\n') {
        let newline = cursor + offset;
        if is_line_at(text, newline + 1, line) {
            return Some(newline);
        }
        cursor = newline + 1;
    }
    None
}

/// True when the line starting at `start` is exactly `line`.
fn is_line_at(text: &str, start: usize, line: &str) -> bool {
    let Some(rest) = text.get(start..) else {
        return false;
    };
    match rest.strip_prefix(line) {
        Some(after) => after.is_empty() || after.starts_with('\n'),
        None => false,
    }
}

fn push_section(sections: &mut Vec<ParsedSection>, path: &str, content: &str) {
    let path = path.trim();
    if path.is_empty() {
        tracing::debug!("skipping section without a path");
        return;
    }
    sections.push(ParsedSection::new(path, content));
}

fn non_empty(sections: Vec<ParsedSection>) -> Option<Vec<ParsedSection>> {
    (!sections.is_empty()).then_some(sections)
}
