//! Bundle serialization.

use std::collections::BTreeMap;
use std::str::FromStr;

use clap::ValueEnum;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::app::tokens::estimate_tokens;
use crate::app::tree::build_tree;
use crate::domain::errors::CodecError;
use crate::domain::model::{BundleResult, BundleStats, Entry};

/// Delimiter line framing every file header in the text format.
pub const FILE_DELIMITER: &str =
    "================================================================================";

/// Prefix of the header line naming a file in the text format.
pub const TEXT_FILE_PREFIX: &str = "FILE: ";

/// Prefix of the heading line naming a file in the markdown format.
pub const MARKDOWN_FILE_PREFIX: &str = "### File: ";

/// Supported bundle formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum BundleFormat {
    /// Plain text with `=` delimited file headers.
    #[default]
    Text,
    /// Markdown document with fenced code blocks.
    Markdown,
    /// Single compact JSON document.
    Json,
}

impl BundleFormat {
    /// Return a stable identifier for configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleFormat::Text => "text",
            BundleFormat::Markdown => "markdown",
            BundleFormat::Json => "json",
        }
    }

    /// Recommended file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            BundleFormat::Text => "txt",
            BundleFormat::Markdown => "md",
            BundleFormat::Json => "json",
        }
    }
}

impl FromStr for BundleFormat {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" | "plain" => Ok(BundleFormat::Text),
            "markdown" | "md" => Ok(BundleFormat::Markdown),
            "json" => Ok(BundleFormat::Json),
            other => Err(ParseOptionError::UnknownFormat(other.to_string())),
        }
    }
}

/// Assistant-specific header prepended to a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum PromptTemplate {
    /// No preamble.
    #[default]
    None,
    /// XML-style context block.
    Claude,
    #[value(name = "chatgpt")]
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Gemini,
}

impl PromptTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::None => "none",
            PromptTemplate::Claude => "claude",
            PromptTemplate::ChatGpt => "chatgpt",
            PromptTemplate::Gemini => "gemini",
        }
    }
}

impl FromStr for PromptTemplate {
    type Err = ParseOptionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(PromptTemplate::None),
            "claude" => Ok(PromptTemplate::Claude),
            "chatgpt" | "openai" => Ok(PromptTemplate::ChatGpt),
            "gemini" => Ok(PromptTemplate::Gemini),
            other => Err(ParseOptionError::UnknownTemplate(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`BundleFormat`] or [`PromptTemplate`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseOptionError {
    #[error("unknown bundle format '{0}'")]
    UnknownFormat(String),
    #[error("unknown prompt template '{0}'")]
    UnknownTemplate(String),
}

/// Preamble sources, rendered with `project` and `tree` in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preambles {
    pub claude: String,
    pub chatgpt: String,
    pub gemini: String,
}

impl Default for Preambles {
    fn default() -> Self {
        Self {
            claude: CLAUDE_PREAMBLE.to_owned(),
            chatgpt: CHATGPT_PREAMBLE.to_owned(),
            gemini: GEMINI_PREAMBLE.to_owned(),
        }
    }
}

impl Preambles {
    fn source(&self, template: PromptTemplate) -> Option<&str> {
        match template {
            PromptTemplate::None => None,
            PromptTemplate::Claude => Some(&self.claude),
            PromptTemplate::ChatGpt => Some(&self.chatgpt),
            PromptTemplate::Gemini => Some(&self.gemini),
        }
    }
}

/// Options for a single bundling run.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub format: BundleFormat,
    pub template: PromptTemplate,
    pub archive_name: String,
}

impl BundleOptions {
    pub fn new(format: BundleFormat, template: PromptTemplate, archive_name: impl Into<String>) -> Self {
        Self {
            format,
            template,
            archive_name: archive_name.into(),
        }
    }
}

/// Renders selected entries into a bundle.
pub struct Bundler {
    env: Environment<'static>,
    preambles: Preambles,
}

impl Default for Bundler {
    fn default() -> Self {
        Self {
            env: default_environment(),
            preambles: Preambles::default(),
        }
    }
}

impl Bundler {
    /// Create a bundler with the built-in preambles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundler with custom preambles, rejecting sources that fail to render.
    pub fn with_preambles(preambles: Preambles) -> Result<Self, CodecError> {
        let bundler = Self {
            env: default_environment(),
            preambles,
        };
        for template in [
            PromptTemplate::Claude,
            PromptTemplate::ChatGpt,
            PromptTemplate::Gemini,
        ] {
            bundler.render_preamble(template, "project", "└── file\n")?;
        }
        Ok(bundler)
    }

    /// Serialize the selected entries in caller order.
    #[tracing::instrument(skip_all, fields(format = options.format.as_str(), template = options.template.as_str()))]
    pub fn bundle(&self, entries: &[Entry], options: &BundleOptions) -> Result<BundleResult, CodecError> {
        let selected: Vec<&Entry> = entries.iter().filter(|entry| entry.selected).collect();
        let tree = build_tree(selected.iter().map(|entry| entry.path.as_str()));

        let mut bundle_text =
            self.render_preamble(options.template, &options.archive_name, &tree)?;
        match options.format {
            BundleFormat::Json => write_json(&mut bundle_text, &options.archive_name, &selected)?,
            BundleFormat::Markdown => write_markdown(&mut bundle_text, &selected),
            BundleFormat::Text => write_text(&mut bundle_text, &selected),
        }

        let mut languages = BTreeMap::new();
        for entry in &selected {
            *languages.entry(entry.language.clone()).or_insert(0) += 1;
        }

        let result = BundleResult {
            total_files: selected.len(),
            total_size: selected.iter().map(|entry| entry.size).sum(),
            total_tokens: estimate_tokens(&bundle_text),
            tree,
            stats: BundleStats {
                languages,
                total_lines: selected.iter().map(|entry| entry.lines).sum(),
            },
            bundle_text,
        };
        tracing::debug!(
            files = result.total_files,
            tokens = result.total_tokens,
            "bundle rendered"
        );
        Ok(result)
    }

    fn render_preamble(
        &self,
        template: PromptTemplate,
        project: &str,
        tree: &str,
    ) -> Result<String, CodecError> {
        let Some(source) = self.preambles.source(template) else {
            return Ok(String::new());
        };
        self.env
            .render_str(source, context! { project => project, tree => tree })
            .map_err(|err| CodecError::Template {
                kind: template.as_str(),
                source: err,
            })
    }
}

/// Serialize with the built-in preambles.
pub fn serialize(
    entries: &[Entry],
    format: BundleFormat,
    template: PromptTemplate,
    archive_name: &str,
) -> Result<BundleResult, CodecError> {
    Bundler::new().bundle(entries, &BundleOptions::new(format, template, archive_name))
}

/// File name offered to users saving a bundle, e.g. `bundle_app.md`.
pub fn suggested_file_name(format: BundleFormat, archive_name: &str) -> String {
    format!("bundle_{archive_name}.{}", format.extension())
}

fn default_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env
}

#[derive(Serialize)]
struct JsonBundle<'a> {
    project: &'a str,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    p: &'a str,
    c: &'a str,
}

fn write_json(out: &mut String, project: &str, entries: &[&Entry]) -> Result<(), CodecError> {
    let document = JsonBundle {
        project,
        files: entries
            .iter()
            .map(|entry| JsonFile {
                p: &entry.path,
                c: &entry.content,
            })
            .collect(),
    };
    out.push_str(&serde_json::to_string(&document)?);
    Ok(())
}

fn write_markdown(out: &mut String, entries: &[&Entry]) {
    for entry in entries {
        out.push_str(MARKDOWN_FILE_PREFIX);
        out.push_str(&entry.path);
        out.push_str("\n```");
        out.push_str(&entry.language);
        out.push('\n');
        out.push_str(&entry.content);
        out.push_str("\n```\n\n");
    }
}

fn write_text(out: &mut String, entries: &[&Entry]) {
    for entry in entries {
        out.push_str(FILE_DELIMITER);
        out.push('\n');
        out.push_str(TEXT_FILE_PREFIX);
        out.push_str(&entry.path);
        out.push('\n');
        out.push_str(FILE_DELIMITER);
        out.push_str("\n\n");
        out.push_str(&entry.content);
        out.push('\n');
    }
}

const CLAUDE_PREAMBLE: &str = "<context>
Project: {{ project }}
Structure:
{{ tree }}
</context>

";

const CHATGPT_PREAMBLE: &str = "Codebase: {{ project }}
Structure:
{{ tree }}
Files follow:

";

const GEMINI_PREAMBLE: &str = "System: Use this code as context for {{ project }}.
Structure:
{{ tree }}

";

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<Entry> {
        vec![
            Entry::new("src/main.rs", "fn main() {}", "rust"),
            Entry::new("README.md", "# Demo", "markdown"),
        ]
    }

    #[test]
    fn text_format_frames_each_file() {
        let result = serialize(&entries(), BundleFormat::Text, PromptTemplate::None, "demo").unwrap();
        let expected = format!(
            "{d}\nFILE: src/main.rs\n{d}\n\nfn main() {{}}\n{d}\nFILE: README.md\n{d}\n\n# Demo\n",
            d = FILE_DELIMITER
        );
        assert_eq!(result.bundle_text, expected);
        assert_eq!(FILE_DELIMITER.len(), 80);
    }

    #[test]
    fn markdown_format_uses_language_fences() {
        let result =
            serialize(&entries(), BundleFormat::Markdown, PromptTemplate::None, "demo").unwrap();
        assert_eq!(
            result.bundle_text,
            "### File: src/main.rs\n```rust\nfn main() {}\n```\n\n### File: README.md\n```markdown\n# Demo\n```\n\n"
        );
    }

    #[test]
    fn json_format_is_compact_with_short_keys() {
        let result = serialize(&entries(), BundleFormat::Json, PromptTemplate::None, "demo").unwrap();
        assert_eq!(
            result.bundle_text,
            r##"{"project":"demo","files":[{"p":"src/main.rs","c":"fn main() {}"},{"p":"README.md","c":"# Demo"}]}"##
        );
    }

    #[test]
    fn claude_preamble_embeds_name_and_tree() {
        let result =
            serialize(&entries(), BundleFormat::Markdown, PromptTemplate::Claude, "demo").unwrap();
        let preamble = "<context>\nProject: demo\nStructure:\n├── src\n│   └── main.rs\n└── README.md\n\n</context>\n\n";
        assert!(result.bundle_text.starts_with(preamble));
        assert!(result.bundle_text[preamble.len()..].starts_with("### File: src/main.rs\n"));
    }

    #[test]
    fn chatgpt_and_gemini_preambles_are_verbatim() {
        let single = vec![Entry::new("a.py", "print(1)", "python")];
        let chatgpt =
            serialize(&single, BundleFormat::Text, PromptTemplate::ChatGpt, "proj").unwrap();
        assert!(chatgpt
            .bundle_text
            .starts_with("Codebase: proj\nStructure:\n└── a.py\n\nFiles follow:\n\n"));

        let gemini = serialize(&single, BundleFormat::Text, PromptTemplate::Gemini, "proj").unwrap();
        assert!(gemini.bundle_text.starts_with(
            "System: Use this code as context for proj.\nStructure:\n└── a.py\n\n\n"
        ));
    }

    #[test]
    fn only_selected_entries_are_bundled_in_caller_order() {
        let mut entries = vec![
            Entry::new("z.js", "z", "javascript"),
            Entry::new("skip.js", "s", "javascript"),
            Entry::new("a.js", "a", "javascript"),
        ];
        entries[1].selected = false;

        let result = serialize(&entries, BundleFormat::Json, PromptTemplate::None, "x").unwrap();
        let z = result.bundle_text.find("z.js").unwrap();
        let a = result.bundle_text.find("a.js").unwrap();
        assert!(z < a);
        assert!(!result.bundle_text.contains("skip.js"));
        assert_eq!(result.tree, "├── z.js\n└── a.js\n");
        assert_eq!(result.total_files, 2);
    }

    #[test]
    fn aggregates_stats_over_selected_entries() {
        let entries = vec![
            Entry::new("a.rs", "one\ntwo", "rust"),
            Entry::new("b.rs", "three", "rust"),
            Entry::new("c.md", "", "markdown"),
        ];
        let result = serialize(&entries, BundleFormat::Text, PromptTemplate::None, "x").unwrap();
        assert_eq!(result.total_size, 12);
        assert_eq!(result.stats.total_lines, 4);
        assert_eq!(result.stats.languages.get("rust"), Some(&2));
        assert_eq!(result.stats.languages.get("markdown"), Some(&1));
        assert_eq!(result.total_tokens, estimate_tokens(&result.bundle_text));
    }

    #[test]
    fn empty_selection_produces_empty_bundle() {
        let result = serialize(&[], BundleFormat::Text, PromptTemplate::None, "x").unwrap();
        assert_eq!(result.bundle_text, "");
        assert_eq!(result.total_tokens, 0);
        assert_eq!(result.tree, "");
    }

    #[test]
    fn custom_preambles_are_validated() {
        let preambles = Preambles {
            claude: "{% if %}".into(),
            ..Preambles::default()
        };
        assert!(matches!(
            Bundler::with_preambles(preambles),
            Err(CodecError::Template { kind: "claude", .. })
        ));

        let custom = Preambles {
            gemini: "# {{ project }}\n".into(),
            ..Preambles::default()
        };
        let bundler = Bundler::with_preambles(custom).unwrap();
        let result = bundler
            .bundle(
                &entries(),
                &BundleOptions::new(BundleFormat::Text, PromptTemplate::Gemini, "demo"),
            )
            .unwrap();
        assert!(result.bundle_text.starts_with("# demo\n"));
    }

    #[test]
    fn parses_formats_and_templates() {
        assert_eq!(<BundleFormat as FromStr>::from_str("md").unwrap(), BundleFormat::Markdown);
        assert_eq!(<BundleFormat as FromStr>::from_str("TXT").unwrap(), BundleFormat::Text);
        assert!(<BundleFormat as FromStr>::from_str("yaml").is_err());
        assert_eq!(
            <PromptTemplate as FromStr>::from_str("ChatGPT").unwrap(),
            PromptTemplate::ChatGpt
        );
        assert_eq!(
            suggested_file_name(BundleFormat::Markdown, "app"),
            "bundle_app.md"
        );
    }
}
