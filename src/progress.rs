//! Run progress, final results and the events that publish them.
//!
//! A batch run reports through an [`EventCallback`]: one
//! [`BatchEvent::Progress`] per dispatched job and exactly one
//! [`BatchEvent::Complete`] at the end.
//!
//! # Example
//!
//! ```rust
//! use chatdown::progress::{BatchEvent, EventCallback};
//! use std::sync::Arc;
//!
//! let callback: EventCallback = Arc::new(|event| match event {
//!     BatchEvent::Progress(p) => println!("{:.1}% {}", p.percentage, p.current_file),
//!     BatchEvent::Complete(r) => println!("done: {} ok, {} failed", r.success_count, r.error_count),
//! });
//! # let _ = callback;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Name of the event fired on every dispatch.
pub const PROGRESS_EVENT: &str = "processing-progress";

/// Name of the event fired once when a run finishes.
pub const COMPLETE_EVENT: &str = "processing-complete";

/// Snapshot of the active run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total_files: usize,

    /// Jobs dispatched so far (not necessarily finished).
    pub processed_files: usize,

    /// Name of the most recently dispatched job.
    pub current_file: String,

    /// `processed_files / total_files`, 0.0 to 100.0.
    pub percentage: f64,

    pub is_active: bool,

    pub start_time: Option<DateTime<Utc>>,

    /// Running-average estimate, serialized in milliseconds.
    #[serde(with = "millis")]
    pub estimated_remaining: Duration,
}

impl Progress {
    /// Fresh progress for a run over `total_files` jobs.
    pub fn started(total_files: usize) -> Self {
        Self {
            total_files,
            is_active: true,
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Records one more dispatched job and recomputes the estimate.
    ///
    /// `elapsed` is the time since the run started.
    pub fn record_dispatch(&mut self, name: &str, elapsed: Duration) {
        self.processed_files += 1;
        self.current_file = name.to_string();
        self.percentage = if self.total_files == 0 {
            100.0
        } else {
            self.processed_files as f64 / self.total_files as f64 * 100.0
        };
        self.estimated_remaining =
            estimate_remaining(elapsed, self.processed_files, self.total_files);
    }

    /// Jobs not yet dispatched.
    pub fn remaining_files(&self) -> usize {
        self.total_files.saturating_sub(self.processed_files)
    }
}

/// `(elapsed / processed) * (total - processed)`, zero before the first
/// job or once everything is dispatched.
///
/// # Example
///
/// ```rust
/// use chatdown::progress::estimate_remaining;
/// use std::time::Duration;
///
/// let eta = estimate_remaining(Duration::from_secs(10), 2, 6);
/// assert_eq!(eta, Duration::from_secs(20));
/// ```
pub fn estimate_remaining(elapsed: Duration, processed: usize, total: usize) -> Duration {
    if processed == 0 || processed >= total {
        return Duration::ZERO;
    }
    let remaining = (total - processed) as f64;
    elapsed.mul_f64(remaining / processed as f64)
}

/// A job that failed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// `true` when no job failed.
    pub success: bool,
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,

    /// Jobs never dispatched because the run was cancelled.
    pub skipped_count: usize,

    /// Sum of source sizes of the successful jobs.
    pub processed_bytes: u64,

    #[serde(with = "millis")]
    pub duration: Duration,

    /// Failures in completion order.
    pub errors: Vec<FileError>,

    /// Cancellation stopped dispatch before every job started.
    pub cancelled: bool,
}

impl ProcessResult {
    /// Jobs that actually ran.
    pub fn attempted(&self) -> usize {
        self.success_count + self.error_count
    }
}

/// What a run publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum BatchEvent {
    #[serde(rename = "processing-progress")]
    Progress(Progress),
    #[serde(rename = "processing-complete")]
    Complete(ProcessResult),
}

impl BatchEvent {
    /// Channel name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::Progress(_) => PROGRESS_EVENT,
            BatchEvent::Complete(_) => COMPLETE_EVENT,
        }
    }
}

/// Receives run events. Called from the run's coordinator task, so it
/// should return quickly.
pub type EventCallback = Arc<dyn Fn(BatchEvent) + Send + Sync>;

/// Discards every event.
pub fn no_events() -> EventCallback {
    Arc::new(|_| {})
}

/// Forwards events into an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
///
/// # Example
///
/// ```rust
/// use chatdown::progress::{BatchEvent, ProcessResult, channel_events};
///
/// let (callback, mut rx) = channel_events();
/// callback(BatchEvent::Complete(ProcessResult::default()));
/// assert!(matches!(rx.try_recv(), Ok(BatchEvent::Complete(_))));
/// ```
pub fn channel_events() -> (EventCallback, mpsc::UnboundedReceiver<BatchEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: EventCallback = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (callback, rx)
}

/// Logs events through `tracing`.
pub fn log_events() -> EventCallback {
    Arc::new(|event| match &event {
        BatchEvent::Progress(p) => info!(
            event = event.name(),
            processed = p.processed_files,
            total = p.total_files,
            file = %p.current_file,
            eta_ms = p.estimated_remaining.as_millis() as u64,
            "progress"
        ),
        BatchEvent::Complete(r) => info!(
            event = event.name(),
            success = r.success_count,
            errors = r.error_count,
            skipped = r.skipped_count,
            bytes = r.processed_bytes,
            "complete"
        ),
    })
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
