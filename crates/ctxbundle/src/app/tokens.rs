//! Token and line metrics.
//!
//! [`estimate_tokens`] is the approximation embedded in every bundle result. It is
//! deliberately cheap and must not be treated as an exact count. [`TokenCounter`]
//! offers real BPE counts for reporting when callers ask for them.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

/// Average characters per token used by the heuristic.
const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count: `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Number of `\n`-delimited segments. An empty string has one line.
pub fn count_lines(text: &str) -> usize {
    text.split('\n').count()
}

/// Tokenizers available for reporting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum TokenModel {
    /// Four characters per token.
    #[default]
    Heuristic,
    /// OpenAI cl100k_base encoding (GPT-4, GPT-3.5).
    Cl100k,
    /// OpenAI o200k_base encoding (GPT-4o).
    O200k,
}

impl TokenModel {
    /// Return a stable identifier suitable for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenModel::Heuristic => "heuristic",
            TokenModel::Cl100k => "cl100k",
            TokenModel::O200k => "o200k",
        }
    }

    /// Enumerate all known models.
    pub fn all() -> &'static [TokenModel] {
        &[TokenModel::Heuristic, TokenModel::Cl100k, TokenModel::O200k]
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenModel {
    type Err = TokenModelParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "fallback" | "chars" => Ok(TokenModel::Heuristic),
            "cl100k" | "cl100k_base" | "gpt-4" => Ok(TokenModel::Cl100k),
            "o200k" | "o200k_base" | "gpt-4o" => Ok(TokenModel::O200k),
            other => Err(TokenModelParseError::UnknownModel(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`TokenModel`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TokenModelParseError {
    #[error("unknown token model '{0}'")]
    UnknownModel(String),
}

/// Counts tokens with the configured model, falling back to the heuristic when a
/// BPE table cannot be initialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter {
    model: TokenModel,
}

impl TokenCounter {
    pub fn new(model: TokenModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> TokenModel {
        self.model
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let bpe = match tokenizer_for(self.model) {
            Ok(Some(bpe)) => bpe,
            Ok(None) => return estimate_tokens(text),
            Err(err) => {
                tracing::debug!(error = %err, "falling back to heuristic token estimate");
                return estimate_tokens(text);
            }
        };

        match bpe.lock() {
            Ok(core) => core.encode_ordinary(text).len(),
            Err(_) => estimate_tokens(text),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
enum TokenizerInitError {
    #[error("failed to initialize {0} tokenizer: {1}")]
    Bpe(&'static str, String),
}

type SharedBpe = Arc<Mutex<CoreBPE>>;

fn tokenizer_for(model: TokenModel) -> Result<Option<SharedBpe>, TokenizerInitError> {
    match model {
        TokenModel::Heuristic => Ok(None),
        TokenModel::Cl100k => cl100k_tokenizer().map(Some),
        TokenModel::O200k => o200k_tokenizer().map(Some),
    }
}

fn cl100k_tokenizer() -> Result<SharedBpe, TokenizerInitError> {
    static CL100K: OnceLock<Result<SharedBpe, TokenizerInitError>> = OnceLock::new();
    CL100K
        .get_or_init(|| {
            cl100k_base()
                .map(|bpe| Arc::new(Mutex::new(bpe)))
                .map_err(|err| TokenizerInitError::Bpe("cl100k", err.to_string()))
        })
        .clone()
}

fn o200k_tokenizer() -> Result<SharedBpe, TokenizerInitError> {
    static O200K: OnceLock<Result<SharedBpe, TokenizerInitError>> = OnceLock::new();
    O200K
        .get_or_init(|| {
            o200k_base()
                .map(|bpe| Arc::new(Mutex::new(bpe)))
                .map_err(|err| TokenizerInitError::Bpe("o200k", err.to_string()))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_ceiling_of_quarter_length() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("ñññ"), 1);
    }

    #[test]
    fn counts_newline_delimited_segments() {
        assert_eq!(count_lines(""), 1);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("a\nb\n"), 3);
    }

    #[test]
    fn parses_token_models_from_strings() {
        assert_eq!(<TokenModel as FromStr>::from_str("o200k").unwrap(), TokenModel::O200k);
        assert_eq!(<TokenModel as FromStr>::from_str(" CL100K ").unwrap(), TokenModel::Cl100k);
        assert_eq!(
            <TokenModel as FromStr>::from_str("fallback").unwrap(),
            TokenModel::Heuristic
        );
        assert!(<TokenModel as FromStr>::from_str("unknown").is_err());
    }

    #[test]
    fn heuristic_counter_matches_estimate() {
        let counter = TokenCounter::new(TokenModel::Heuristic);
        assert_eq!(counter.count("Hello world!"), estimate_tokens("Hello world!"));
    }

    #[test]
    fn counts_with_openai_tokenizer() {
        let counter = TokenCounter::new(TokenModel::O200k);
        assert_eq!(counter.count("Hello world!"), 3);
        assert_eq!(counter.count(""), 0);
    }
}
