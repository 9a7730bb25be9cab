//! CLI argument definitions for the UMLS grounder.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use umls_cli::config::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "umls-grounder",
    version,
    about = "Ground radiology entity mentions to UMLS concepts",
    long_about = "Ground entity mentions extracted from radiology reports to UMLS concepts.\n\n\
                  Mentions are matched against an MRCONSO.RRF reference file in a single\n\
                  sharded pass; results are written as JSON artifacts and a coverage CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow mention text in log output (redacted by default).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ground every entity of an extractor output file and write artifacts.
    Ground(GroundArgs),

    /// Ground mentions given on the command line and print their candidates.
    Resolve(ResolveArgs),

    /// Print the normalized text and lookup keys of mentions.
    Keys(KeysArgs),
}

#[derive(Parser)]
pub struct GroundArgs {
    /// Extractor output: a JSON array of documents, `{"documents": [...]}`, or JSON Lines.
    #[arg(value_name = "DOCUMENTS")]
    pub documents: PathBuf,

    /// Output directory for artifacts (default: <DOCUMENTS dir>/grounding).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Ground and report without writing artifacts.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub reference: ReferenceArgs,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Mention texts to ground.
    #[arg(value_name = "MENTION", required = true)]
    pub mentions: Vec<String>,

    /// Entity type hint applied to every mention (repeatable).
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    #[command(flatten)]
    pub reference: ReferenceArgs,
}

#[derive(Parser)]
pub struct KeysArgs {
    /// Mention texts to key.
    #[arg(value_name = "MENTION", required = true)]
    pub mentions: Vec<String>,
}

/// Reference and ranking options shared by grounding commands.
#[derive(Args)]
pub struct ReferenceArgs {
    /// Path to MRCONSO.RRF (overrides `reference_file` in the config).
    #[arg(long = "reference", value_name = "PATH")]
    pub reference: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum candidates kept per mention.
    #[arg(long = "top-k", value_name = "N")]
    pub top_k: Option<usize>,

    /// Source vocabularies in preference order, comma separated.
    #[arg(
        long = "source-preference",
        value_name = "SAB",
        value_delimiter = ',',
        conflicts_with = "no_source_preference"
    )]
    pub source_preference: Option<Vec<String>>,

    /// Rank all source vocabularies equally.
    #[arg(long = "no-source-preference")]
    pub no_source_preference: bool,

    /// Drop candidates whose semantic types do not fit the mention's type hints.
    #[arg(long = "semantic-filter")]
    pub semantic_filter: bool,

    /// Path to MRSTY.RRF supplying CUI semantic types for the filter.
    #[arg(long = "semantic-types", value_name = "PATH")]
    pub semantic_types: Option<PathBuf>,

    /// Number of reference scan shards (0 = one per worker thread).
    #[arg(long = "shards", value_name = "N")]
    pub shards: Option<usize>,

    /// Abort the reference scan after this many seconds.
    #[arg(long = "deadline-secs", value_name = "SECS")]
    pub deadline_secs: Option<u64>,
}

impl ReferenceArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            reference_file: self.reference.clone(),
            top_k: self.top_k,
            source_preference: if self.no_source_preference {
                Some(Vec::new())
            } else {
                self.source_preference.clone()
            },
            semantic_filter: self.semantic_filter.then_some(true),
            semantic_types_file: self.semantic_types.clone(),
            shards: self.shards,
            deadline_secs: self.deadline_secs,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
