//! # CLI Argument Definitions

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "nseries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Allocate and inspect document numbers from a number-series catalog")]
pub(crate) struct Cli {
    /// Configuration file (`nseries.toml` in the working directory by default)
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Series and usage date shared by the allocation commands.
#[derive(Debug, Args)]
pub(crate) struct Target {
    /// Series code
    pub(crate) series: String,
    /// Usage date (work date when omitted)
    #[arg(short, long)]
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Allocate numbers in one transaction and commit them
    Next {
        #[command(flatten)]
        target: Target,
        /// How many numbers to allocate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Print nothing instead of failing when the series has no usable number
        #[arg(long)]
        suppress: bool,
    },
    /// Allocate numbers through a batch, committing once at the end
    Batch {
        #[command(flatten)]
        target: Target,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Preview only; nothing is written
        #[arg(long)]
        simulate: bool,
    },
    /// Show the next number without consuming it
    Peek {
        #[command(flatten)]
        target: Target,
    },
    /// Show the last number used on the selected line
    Last {
        #[command(flatten)]
        target: Target,
    },
    /// List the lines of a series
    Lines {
        /// Series code
        series: String,
    },
    /// Check whether a number may be typed by hand
    Manual {
        /// Series code
        series: String,
        /// Document the number is for
        #[arg(long)]
        document: Option<String>,
    },
    /// List the series that may replace the given one
    Related {
        /// Series code
        series: String,
    },
    /// Check that a document number is the next one the series will issue
    Verify {
        #[command(flatten)]
        target: Target,
        /// Document number to check
        document: String,
    },
}
