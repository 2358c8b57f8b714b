//! Source directory validation and job discovery.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ChatdownError, Result};
use crate::job::{JobDescriptor, is_source_file};

/// Checks that `path` exists and is a directory.
pub fn validate_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ChatdownError::DirectoryNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    if !metadata.is_dir() {
        return Err(ChatdownError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Lists every `.json` file under `root` as a pending job.
///
/// Without `include_subdirs` only direct children are considered. Results
/// are ordered by path.
///
/// # Example
///
/// ```rust,no_run
/// use chatdown::discovery::scan_directory;
///
/// let jobs = scan_directory("exports", true)?;
/// for job in &jobs {
///     println!("{} -> {}", job.source_path.display(), job.destination_path.display());
/// }
/// # Ok::<(), chatdown::ChatdownError>(())
/// ```
pub fn scan_directory(root: impl AsRef<Path>, include_subdirs: bool) -> Result<Vec<JobDescriptor>> {
    let root = root.as_ref();
    validate_directory(root)?;

    let max_depth = if include_subdirs { usize::MAX } else { 1 };
    let mut jobs = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ChatdownError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() || !is_source_file(entry.path()) {
            continue;
        }

        // Symlinks are not followed during the walk; size them by their target.
        let metadata = match entry.path_is_symlink().then(|| fs::metadata(entry.path())) {
            Some(Ok(target)) if target.is_dir() => continue,
            Some(Ok(target)) => target,
            _ => entry.metadata().map_err(|source| ChatdownError::Discovery {
                path: root.to_path_buf(),
                source,
            })?,
        };

        let mut job = JobDescriptor::new(entry.path(), metadata.len());
        if let Ok(modified) = metadata.modified() {
            job = job.with_modified_at(DateTime::<Utc>::from(modified));
        }
        jobs.push(job);
    }

    debug!(root = %root.display(), found = jobs.len(), include_subdirs, "scanned directory");
    Ok(jobs)
}
