//! Concurrent batch conversion.
//!
//! [`BatchProcessor`] runs one batch at a time on the ambient tokio runtime.
//! Jobs are dispatched in order onto a pool bounded by
//! [`BatchConfig::max_concurrency`]; a failing job is recorded and the run
//! moves on. Cancellation stops further dispatch, while jobs already
//! dispatched run to completion.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatdown::batch::BatchProcessor;
//! use chatdown::config::BatchConfig;
//! use chatdown::converter::MarkdownConverter;
//! use chatdown::discovery::scan_directory;
//! use chatdown::progress::log_events;
//!
//! # async fn run() -> chatdown::Result<()> {
//! let jobs = scan_directory("exports", true)?;
//! let processor = BatchProcessor::new(MarkdownConverter::new()).with_events(log_events());
//!
//! let handle = processor.start(jobs, &BatchConfig::new().with_max_concurrency(8))?;
//! let result = handle.wait().await?;
//! println!("{} converted, {} failed", result.success_count, result.error_count);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BatchConfig;
use crate::converter::MarkdownConverter;
use crate::error::{ChatdownError, Result};
use crate::job::JobDescriptor;
use crate::progress::{BatchEvent, EventCallback, FileError, ProcessResult, Progress, no_events};

/// State shared between the processor and its active run.
#[derive(Default)]
struct RunState {
    active: bool,
    progress: Progress,
    cancel: Option<CancellationToken>,
}

/// Per-run aggregate counters, shared by all workers.
#[derive(Default)]
struct Tally {
    success_count: usize,
    error_count: usize,
    processed_bytes: u64,
    errors: Vec<FileError>,
}

impl Tally {
    fn record(&mut self, job: &JobDescriptor, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                self.success_count += 1;
                self.processed_bytes += job.size_bytes;
            }
            Err(err) => self.record_failure(FileError {
                path: job.source_path.clone(),
                message: err.to_string(),
            }),
        }
    }

    fn record_failure(&mut self, failure: FileError) {
        self.error_count += 1;
        self.errors.push(failure);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Converts many exports concurrently.
///
/// Cloning is cheap; clones share the same run state, so any clone can
/// query or cancel the active run.
#[derive(Clone)]
pub struct BatchProcessor {
    converter: Arc<MarkdownConverter>,
    events: EventCallback,
    state: Arc<Mutex<RunState>>,
}

impl BatchProcessor {
    /// Creates an idle processor that publishes no events.
    pub fn new(converter: MarkdownConverter) -> Self {
        Self {
            converter: Arc::new(converter),
            events: no_events(),
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    /// Sets the event reporter for runs started after this call.
    #[must_use]
    pub fn with_events(mut self, events: EventCallback) -> Self {
        self.events = events;
        self
    }

    /// Starts a run over `jobs` and returns immediately.
    ///
    /// Fails with [`ChatdownError::RunActive`] while another run is active,
    /// [`ChatdownError::NoJobs`] for an empty list, and
    /// [`ChatdownError::NoRuntime`] outside a tokio runtime. A rejected
    /// request leaves the active run untouched.
    pub fn start(&self, jobs: Vec<JobDescriptor>, config: &BatchConfig) -> Result<RunHandle> {
        let runtime = Handle::try_current().map_err(|_| ChatdownError::NoRuntime)?;

        let token = {
            let mut state = lock(&self.state);
            if state.active {
                return Err(ChatdownError::RunActive);
            }
            if jobs.is_empty() {
                return Err(ChatdownError::NoJobs);
            }

            let token = CancellationToken::new();
            state.active = true;
            state.progress = Progress::started(jobs.len());
            state.cancel = Some(token.clone());
            token
        };

        let concurrency = config.effective_concurrency().min(jobs.len());
        let run = Run {
            jobs,
            concurrency,
            converter: Arc::clone(&self.converter),
            events: Arc::clone(&self.events),
            token: token.clone(),
            active: ActiveRun {
                state: Arc::clone(&self.state),
            },
        };

        Ok(RunHandle {
            task: runtime.spawn(run.execute()),
            token,
        })
    }

    /// Stops dispatching further jobs of the active run.
    ///
    /// Fails with [`ChatdownError::NotRunning`] if no run is active.
    pub fn cancel(&self) -> Result<()> {
        let state = lock(&self.state);
        match (&state.cancel, state.active) {
            (Some(token), true) => {
                warn!("cancellation requested");
                token.cancel();
                Ok(())
            }
            _ => Err(ChatdownError::NotRunning),
        }
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> Progress {
        lock(&self.state).progress.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    task: JoinHandle<ProcessResult>,
    token: CancellationToken,
}

impl RunHandle {
    /// Waits for the run to finish.
    pub async fn wait(self) -> Result<ProcessResult> {
        Ok(self.task.await?)
    }

    /// Stops dispatching further jobs of this run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Marks the processor idle when dropped, including when the coordinator
/// panics.
struct ActiveRun {
    state: Arc<Mutex<RunState>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.active = false;
        state.progress.is_active = false;
        state.cancel = None;
    }
}

struct Run {
    jobs: Vec<JobDescriptor>,
    concurrency: usize,
    converter: Arc<MarkdownConverter>,
    events: EventCallback,
    token: CancellationToken,
    active: ActiveRun,
}

impl Run {
    async fn execute(self) -> ProcessResult {
        let Run {
            jobs,
            concurrency,
            converter,
            events,
            token,
            active,
        } = self;

        let started = Instant::now();
        let total_files = jobs.len();
        info!(total_files, concurrency, "batch run started");

        let pool = Arc::new(Semaphore::new(concurrency));
        let tally = Arc::new(Mutex::new(Tally::default()));
        let mut workers = JoinSet::new();
        let mut dispatched = 0;

        for job in jobs {
            if token.is_cancelled() {
                break;
            }

            let permit = tokio::select! {
                biased;
                () = token.cancelled() => break,
                permit = Arc::clone(&pool).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if token.is_cancelled() {
                break;
            }

            dispatched += 1;
            let snapshot = {
                let mut state = lock(&active.state);
                state.progress.record_dispatch(&job.name, started.elapsed());
                state.progress.clone()
            };
            events(BatchEvent::Progress(snapshot));

            debug!(file = %job.source_path.display(), "dispatching job");
            let converter = Arc::clone(&converter);
            let tally = Arc::clone(&tally);
            workers.spawn(async move {
                let outcome = process_job(converter, &job).await;
                drop(permit);

                match &outcome {
                    Ok(()) => debug!(file = %job.source_path.display(), "job completed"),
                    Err(err) => warn!(file = %job.source_path.display(), error = %err, "job failed"),
                }
                lock(&tally).record(&job, outcome);
            });
        }

        let skipped_count = total_files - dispatched;
        if skipped_count > 0 {
            info!(skipped_count, "run cancelled, remaining jobs skipped");
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "conversion worker panicked");
                lock(&tally).record_failure(FileError {
                    path: PathBuf::new(),
                    message: err.to_string(),
                });
            }
        }

        let tally = std::mem::take(&mut *lock(&tally));
        let result = ProcessResult {
            success: tally.error_count == 0,
            total_files,
            success_count: tally.success_count,
            error_count: tally.error_count,
            skipped_count,
            processed_bytes: tally.processed_bytes,
            duration: started.elapsed(),
            errors: tally.errors,
            cancelled: skipped_count > 0,
        };

        drop(active);
        info!(
            success = result.success_count,
            errors = result.error_count,
            skipped = result.skipped_count,
            bytes = result.processed_bytes,
            duration_ms = result.duration.as_millis() as u64,
            "batch run finished"
        );
        events(BatchEvent::Complete(result.clone()));
        result
    }
}

/// Reads, converts and writes one job.
async fn process_job(converter: Arc<MarkdownConverter>, job: &JobDescriptor) -> Result<()> {
    let content = tokio::fs::read(&job.source_path)
        .await
        .map_err(|e| ChatdownError::read(&job.source_path, e))?;

    let source = job.source_path.clone();
    let markdown = tokio::task::spawn_blocking(move || {
        converter.convert_slice(&content, Some(source.as_path()))
    })
    .await??;

    write_output(&job.destination_path, markdown.as_bytes()).await
}

/// Writes `content` to `path`, removing the file if the write fails.
async fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ChatdownError::write(path, e))?;

    let written = match file.write_all(content).await {
        Ok(()) => file.flush().await,
        Err(err) => Err(err),
    };

    if let Err(err) = written {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(ChatdownError::write(path, err));
    }

    Ok(())
}
