//! Codec errors.

use thiserror::Error;

/// Help text listing every bundle shape the reverse parser understands.
pub const SUPPORTED_FORMATS_HELP: &str = "Supported formats:\n\
- Text: a line of 80 '=' characters, `FILE: <path>`, another line of 80 '=' characters, a blank line, then the file content\n\
- Markdown: `### File: <path>` followed by a fenced code block (```lang ... ```)\n\
- JSON: {\"files\": [{\"path\": \"...\", \"content\": \"...\"}]}";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("content of '{path}' is not valid UTF-8 text")]
    Decode { path: String },

    #[error("no files found in the input.\n\n{}", SUPPORTED_FORMATS_HELP)]
    NoSectionsFound,

    #[error("input is not a JSON bundle: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("failed to render '{kind}' preamble: {source}")]
    Template {
        kind: &'static str,
        #[source]
        source: minijinja::Error,
    },
}
