//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "vgrid",
    version,
    about = "Hanging protocol dry-runs and validation",
    long_about = "Match a study description against a hanging protocol and print the\n\
                  resulting viewport grid, or statically validate a protocol\n\
                  definition before shipping it."
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Match a study against a protocol and print the resulting grid.
    Layout(LayoutArgs),

    /// Statically validate a protocol definition.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct LayoutArgs {
    /// Path to the study description JSON.
    #[arg(value_name = "STUDY_JSON")]
    pub study: PathBuf,

    /// Path to the hanging protocol JSON.
    #[arg(long = "protocol", value_name = "PROTOCOL_JSON")]
    pub protocol: PathBuf,

    /// Prior study description JSON (repeatable, newest first not required).
    #[arg(long = "prior", value_name = "STUDY_JSON")]
    pub priors: Vec<PathBuf>,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Path to the hanging protocol JSON.
    #[arg(value_name = "PROTOCOL_JSON")]
    pub protocol: PathBuf,
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
