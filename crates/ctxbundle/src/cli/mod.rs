//! Command line front end.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::export::{BundleFormat, PromptTemplate};
use crate::app::tokens::TokenModel;

#[derive(Debug, Parser)]
#[command(
    name = "ctxbundle",
    author,
    version,
    about = "Flatten source trees into LLM-ready bundles and rebuild files from them",
    long_about = None
)]
pub struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra configuration file layered over global and workspace config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Flatten a directory into a single bundle
    Bundle(BundleArgs),
    /// Rebuild files from a bundle in text, markdown, or JSON format
    Reverse(ReverseArgs),
    /// Print the tree of files a bundle would contain
    Tree(TreeArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Include/exclude globs toggling which discovered files are selected.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Only select files matching this glob (repeatable)
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Deselect files matching this glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BundleArgs {
    /// Directory to bundle
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Output format [default: from config, else text]
    #[arg(short, long, value_enum)]
    pub format: Option<BundleFormat>,

    /// Assistant preamble [default: from config, else none]
    #[arg(short, long, value_enum)]
    pub template: Option<PromptTemplate>,

    /// Project name embedded in preambles and JSON [default: directory name]
    #[arg(short, long)]
    pub name: Option<String>,

    /// Write the bundle here instead of stdout; a directory gets `bundle_<name>.<ext>`
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Print bundle statistics to stderr
    #[arg(long)]
    pub stats: bool,

    /// Tokenizer used for the statistics report
    #[arg(long, value_enum)]
    pub tokenizer: Option<TokenModel>,
}

#[derive(Debug, Args)]
pub struct ReverseArgs {
    /// Bundle file to read, `-` or omitted for stdin
    pub input: Option<PathBuf>,

    /// Directory to write files into [default: reconstructed_project_<timestamp>]
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Keep leading and trailing whitespace of recovered content
    #[arg(long)]
    pub exact: bool,

    /// List recovered files without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Directory to inspect
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl Cli {
    /// Execute the parsed command.
    pub fn run(self) -> Result<()> {
        let config_path = self.config.as_deref();
        match self.command {
            Commands::Bundle(args) => commands::bundle(args, config_path),
            Commands::Reverse(args) => commands::reverse(args),
            Commands::Tree(args) => commands::tree(args, config_path),
            Commands::Completions { shell } => commands::completions(shell),
        }
    }
}
