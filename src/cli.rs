//! Command-line interface definition using clap.
//!
//! [`Args`] maps directly onto the library's configuration types, so the
//! binary stays a thin shell around [`BatchProcessor`](crate::batch::BatchProcessor).

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BatchConfig, ConvertConfig, DEFAULT_DATE_FORMAT, DEFAULT_MAX_CONCURRENCY, DatePolicy};
use crate::progress::ProcessResult;

/// Convert a directory of Telegram chat exports into Markdown.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatdown")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatdown ./exports
    chatdown ./exports -r -j 8
    chatdown ./exports --no-metadata --date-format \"%d.%m.%Y %H:%M\"
    RUST_LOG=chatdown=debug chatdown ./exports")]
pub struct Args {
    /// Directory containing .json exports
    pub directory: PathBuf,

    /// Include subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum files converted at once (0 or less uses the default)
    #[arg(
        short = 'j',
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_CONCURRENCY as i64,
        allow_negative_numbers = true
    )]
    pub concurrency: i64,

    /// Omit the chat header block
    #[arg(long)]
    pub no_metadata: bool,

    /// Omit photo, file and media blocks
    #[arg(long)]
    pub no_media: bool,

    /// strftime pattern for message dates
    #[arg(long, value_name = "FORMAT", default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,

    /// Keep unparseable dates as written instead of substituting the current time
    #[arg(long)]
    pub raw_dates: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Conversion settings selected on the command line.
    pub fn convert_config(&self) -> ConvertConfig {
        let policy = if self.raw_dates {
            DatePolicy::BestEffortOrRaw
        } else {
            DatePolicy::BestEffortOrNow
        };

        ConvertConfig::new()
            .with_metadata(!self.no_metadata)
            .with_media(!self.no_media)
            .with_date_format(self.date_format.clone())
            .with_date_policy(policy)
    }

    /// Batch settings selected on the command line.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new()
            .with_max_concurrency(usize::try_from(self.concurrency).unwrap_or(0))
            .with_include_subdirs(self.recursive)
    }

    /// Default log filter for the chosen verbosity; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "chatdown=info",
            1 => "chatdown=debug",
            _ => "chatdown=trace",
        }
    }
}

/// Exit status for a run stopped by cancellation, as after SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Process exit status for a finished run.
///
/// A cancelled run exits with [`EXIT_INTERRUPTED`] even when every
/// dispatched file converted; any failed file exits with 1.
pub fn exit_code(result: &ProcessResult) -> i32 {
    if result.cancelled {
        EXIT_INTERRUPTED
    } else if result.success {
        0
    } else {
        1
    }
}
