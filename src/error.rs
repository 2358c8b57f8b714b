//! Unified error types for chatdown.
//!
//! This module provides a single [`ChatdownError`] enum that covers every
//! failure the library can surface. Errors fall into three families:
//!
//! - **Discovery errors**: the source directory is missing, is not a
//!   directory, or could not be traversed. Fatal to starting a run.
//! - **Admission errors**: a run request or cancel request was refused.
//!   Fatal to the *request*, never to a run that is already in progress.
//! - **Per-file errors**: a source could not be read or parsed, or the
//!   destination could not be written. Inside a batch these are captured into
//!   [`FileError`](crate::progress::FileError) records and never abort the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for chatdown operations.
///
/// # Example
///
/// ```rust
/// use chatdown::error::Result;
///
/// fn my_function() -> Result<String> {
///     Ok(String::new())
/// }
/// ```
pub type Result<T> = std::result::Result<T, ChatdownError>;

/// The error type for all chatdown operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatdownError {
    /// An I/O error occurred while reading a source export.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A source export could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Source path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The source export is not valid JSON or does not match the export shape.
    #[error("Failed to parse JSON{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The destination document could not be created or written.
    ///
    /// Any partially written file has already been removed when this is returned.
    #[error("Failed to write output {}: {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The source directory does not exist.
    #[error("Directory does not exist: {}", path.display())]
    DirectoryNotFound {
        /// The path that was checked
        path: PathBuf,
    },

    /// The source path exists but is not a directory.
    #[error("Path is not a directory: {}", path.display())]
    NotADirectory {
        /// The path that was checked
        path: PathBuf,
    },

    /// Walking the source directory failed part-way.
    #[error("Failed to scan directory {}: {source}", path.display())]
    Discovery {
        /// Root of the scan
        path: PathBuf,
        /// The underlying traversal error
        #[source]
        source: walkdir::Error,
    },

    /// A conversion task panicked or was aborted.
    #[error("Conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A batch run is already active.
    #[error("Processing is already in progress")]
    RunActive,

    /// A batch run was requested with an empty job list.
    #[error("No JSON files to process")]
    NoJobs,

    /// Cancellation was requested while no run is active.
    #[error("No processing is in progress")]
    NotRunning,

    /// A batch run was requested outside of a tokio runtime.
    #[error("Batch processing requires a running tokio runtime")]
    NoRuntime,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ChatdownError {
    /// Creates a parse error, optionally tagged with the source path.
    pub fn parse(source: serde_json::Error, path: Option<PathBuf>) -> Self {
        ChatdownError::Parse { source, path }
    }

    /// Creates a read error for the given source.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChatdownError::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error for the given destination.
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ChatdownError::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ChatdownError::Io(_) | ChatdownError::Read { .. } | ChatdownError::Write { .. }
        )
    }

    /// Returns `true` if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, ChatdownError::Parse { .. })
    }

    /// Returns `true` if this error was raised while validating or scanning
    /// the source directory.
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            ChatdownError::DirectoryNotFound { .. }
                | ChatdownError::NotADirectory { .. }
                | ChatdownError::Discovery { .. }
        )
    }

    /// Returns `true` if a run request or cancel request was refused.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            ChatdownError::RunActive
                | ChatdownError::NoJobs
                | ChatdownError::NotRunning
                | ChatdownError::NoRuntime
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
