//! Units of batch work.
//!
//! A [`JobDescriptor`] pairs one source export with the Markdown file it
//! will be rendered into, plus the metadata used for progress accounting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extension of recognized source exports (compared case-insensitively).
pub const SOURCE_EXTENSION: &str = "json";

/// Extension given to rendered documents.
pub const OUTPUT_EXTENSION: &str = "md";

/// Lifecycle label of a job. Observational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

/// One source document and where its rendering goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// File name shown in progress reports.
    pub name: String,
    /// Source size in bytes.
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: JobStatus,
}

impl JobDescriptor {
    /// Creates a pending job for `source`, deriving name and destination.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatdown::job::JobDescriptor;
    /// use std::path::Path;
    ///
    /// let job = JobDescriptor::new("exports/result.json", 2048);
    /// assert_eq!(job.name, "result.json");
    /// assert_eq!(job.destination_path, Path::new("exports/result.md"));
    /// ```
    pub fn new(source: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let source_path = source.into();
        let name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            destination_path: destination_path(&source_path),
            source_path,
            name,
            size_bytes,
            modified_at: None,
            status: JobStatus::Pending,
        }
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }
}

/// Computes where a source's rendering is written: same directory, same
/// base name, `.md` extension.
///
/// # Example
///
/// ```rust
/// use chatdown::job::destination_path;
/// use std::path::Path;
///
/// assert_eq!(destination_path(Path::new("/a/b/chat.json")), Path::new("/a/b/chat.md"));
/// assert_eq!(destination_path(Path::new("chat.backup.JSON")), Path::new("chat.backup.md"));
/// ```
pub fn destination_path(source: &Path) -> PathBuf {
    source.with_extension(OUTPUT_EXTENSION)
}

/// Returns `true` if `path` has a source-export extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
}
