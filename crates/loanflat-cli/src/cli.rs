//! CLI argument definitions for the `loanflat` harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use loanflat_cli::shard::Shard;

#[derive(Parser)]
#[command(
    name = "loanflat",
    version,
    about = "Flatten loan application documents into relational records",
    long_about = "Flatten loan application XML documents into table-shaped records.\n\n\
                  Every extraction rule comes from a versioned JSON mapping contract;\n\
                  output is one table -> records map per document, as JSON or CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
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

    /// Allow applicant values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a mapping contract and print its table layout.
    CheckContract(CheckContractArgs),

    /// Flatten documents with a mapping contract.
    Transform(TransformArgs),
}

#[derive(Parser)]
pub struct CheckContractArgs {
    /// Mapping contract (JSON).
    #[arg(value_name = "CONTRACT", env = "LOANFLAT_CONTRACT")]
    pub contract: PathBuf,
}

#[derive(Parser)]
pub struct TransformArgs {
    /// Mapping contract (JSON).
    #[arg(long, value_name = "FILE", env = "LOANFLAT_CONTRACT")]
    pub contract: PathBuf,

    /// Documents to process: XML files or directories of `.xml` files.
    #[arg(value_name = "DOCS", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory for generated files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Output format to generate.
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormatArg,

    /// Pin the processing time used for missing timestamps (RFC 3339).
    ///
    /// Makes repeated runs over the same documents byte-identical.
    #[arg(long = "now", value_name = "RFC3339")]
    pub now: Option<String>,

    /// Only process documents in this shard, e.g. `0/4`.
    ///
    /// Documents are assigned by a hash of their file name, so parallel
    /// processes given `0/n` .. `n-1/n` cover every document exactly once.
    #[arg(long = "shard", value_name = "INDEX/COUNT")]
    pub shard: Option<Shard>,

    /// Fail documents that have no admissible entity.
    #[arg(long = "strict-entities")]
    pub strict_entities: bool,

    /// Treat over-long text as a field error instead of truncating it.
    #[arg(long = "no-truncate")]
    pub no_truncate: bool,

    /// Process and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Csv,
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
