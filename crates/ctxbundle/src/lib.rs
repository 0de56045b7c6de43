pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub use app::classify::{Classifier, FilterRules, LanguageMap, SkipReason};
pub use app::export::{BundleFormat, BundleOptions, Bundler, Preambles, PromptTemplate, serialize};
pub use app::reverse::{ParseOutcome, ReverseOptions, ReverseParser, parse};
pub use app::tokens::{count_lines, estimate_tokens};
pub use app::tree::build_tree;
pub use domain::errors::CodecError;
pub use domain::model::{BundleResult, BundleStats, Entry, ParsedSection, RawContent, RawEntry};

pub fn init(verbosity: u8) -> anyhow::Result<()> {
    infra::logging::init(verbosity)
}
