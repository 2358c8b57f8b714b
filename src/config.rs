//! Configuration types for conversion and batch processing.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies.
//!
//! - [`ConvertConfig`] - controls how a single export is rendered
//! - [`BatchConfig`] - controls discovery and concurrency of a batch run
//! - [`DatePolicy`] - what to do with dates that match no known format
//!
//! # Example
//!
//! ```rust
//! use chatdown::config::{BatchConfig, ConvertConfig, DatePolicy};
//!
//! let convert = ConvertConfig::new()
//!     .with_media(false)
//!     .with_date_policy(DatePolicy::BestEffortOrRaw);
//!
//! let batch = BatchConfig::new()
//!     .with_max_concurrency(8)
//!     .with_include_subdirs(true);
//!
//! assert_eq!(batch.effective_concurrency(), 8);
//! assert!(!convert.include_media);
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Default number of files converted concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default `strftime` pattern used for message headers.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fallback behaviour when a message date matches none of the known formats.
///
/// Dates are tried as `2006-01-02T15:04:05` first, then `2006-01-02 15:04:05`.
/// What happens when both fail is an explicit, observable choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Substitute the current local time and log a warning.
    ///
    /// This is lossy: the rendered date no longer reflects the source.
    #[default]
    BestEffortOrNow,

    /// Emit the raw source string unchanged.
    BestEffortOrRaw,
}

/// Configuration for rendering an export to Markdown.
///
/// # Example
///
/// ```rust
/// use chatdown::config::ConvertConfig;
///
/// let config = ConvertConfig::new()
///     .with_metadata(false)
///     .with_date_format("%d.%m.%Y %H:%M");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Emit the chat header block (title, type, id, message count) (default: true)
    pub include_metadata: bool,

    /// Emit photo/file/media-type blocks (default: true)
    pub include_media: bool,

    /// `strftime` pattern for message dates (default: `%Y-%m-%d %H:%M:%S`)
    pub date_format: String,

    /// Fallback for unparseable dates (default: [`DatePolicy::BestEffortOrNow`])
    pub date_policy: DatePolicy,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_media: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            date_policy: DatePolicy::default(),
        }
    }
}

impl ConvertConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the header block.
    #[must_use]
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.include_metadata = enabled;
        self
    }

    /// Enables or disables media blocks.
    #[must_use]
    pub fn with_media(mut self, enabled: bool) -> Self {
        self.include_media = enabled;
        self
    }

    /// Sets the output date pattern.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Sets the fallback for unparseable dates.
    #[must_use]
    pub fn with_date_policy(mut self, policy: DatePolicy) -> Self {
        self.date_policy = policy;
        self
    }
}

/// Configuration for a batch run.
///
/// # Example
///
/// ```rust
/// use chatdown::config::BatchConfig;
///
/// // Zero means "use the default"
/// let config = BatchConfig::new().with_max_concurrency(0);
/// assert_eq!(config.effective_concurrency(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of files converted at the same time (default: 4, 0 = default)
    pub max_concurrency: usize,

    /// Descend into subdirectories during discovery (default: false)
    pub include_subdirs: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            include_subdirs: false,
        }
    }
}

impl BatchConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit. `0` selects the default.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Sets whether discovery descends into subdirectories.
    #[must_use]
    pub fn with_include_subdirs(mut self, include: bool) -> Self {
        self.include_subdirs = include;
        self
    }

    /// Returns the concurrency limit that will actually be used.
    ///
    /// Zero selects [`DEFAULT_MAX_CONCURRENCY`]; values above the worker
    /// pool's capacity are capped at [`Semaphore::MAX_PERMITS`].
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrency == 0 {
            DEFAULT_MAX_CONCURRENCY
        } else {
            self.max_concurrency.min(Semaphore::MAX_PERMITS)
        }
    }
}
