//! # Chatdown
//!
//! A Rust library for turning Telegram Desktop chat exports into readable
//! Markdown documents, one file or a whole directory at a time.
//!
//! ## Overview
//!
//! - **Conversion**: [`MarkdownConverter`] renders an [`Export`] into a
//!   Markdown document. Rendering is total: malformed text shapes degrade
//!   to empty output instead of failing.
//! - **Batch processing**: [`BatchProcessor`] converts many exports
//!   concurrently with a bounded pool, publishes progress events, supports
//!   cooperative cancellation and reports partial failures per file.
//!
//! ## Quick Start
//!
//! ```rust
//! use chatdown::prelude::*;
//!
//! let json = r#"{
//!     "name": "Chat",
//!     "type": "personal_chat",
//!     "id": 0,
//!     "messages": [
//!         {"type": "message", "date": "2023-01-01T10:00:00", "from": "Alice", "text": "Hello *world*"}
//!     ]
//! }"#;
//!
//! let markdown = MarkdownConverter::new().convert_str(json)?;
//! assert!(markdown.contains(r"Hello \*world\*"));
//! assert!(!markdown.contains("**ID:**"));
//! # Ok::<(), ChatdownError>(())
//! ```
//!
//! ## Converting a Directory
//!
//! ```rust,no_run
//! use chatdown::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let jobs = scan_directory("exports", false)?;
//! let processor = BatchProcessor::new(MarkdownConverter::new());
//! let result = processor.start(jobs, &BatchConfig::new())?.wait().await?;
//!
//! for failure in &result.errors {
//!     eprintln!("{}: {}", failure.path.display(), failure.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`export`]: the export data model
//! - [`markdown`]: escaping, span formatting and date rendering
//! - [`converter`]: [`MarkdownConverter`]
//! - [`config`]: [`ConvertConfig`], [`BatchConfig`], [`DatePolicy`]
//! - [`job`] and [`discovery`]: finding work on disk
//! - [`batch`]: [`BatchProcessor`] and [`RunHandle`]
//! - [`progress`]: [`Progress`], [`ProcessResult`] and run events
//! - [`error`]: [`ChatdownError`] and [`Result`]

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod converter;
pub mod discovery;
pub mod error;
pub mod export;
pub mod job;
pub mod markdown;
pub mod progress;

pub use batch::{BatchProcessor, RunHandle};
pub use config::{BatchConfig, ConvertConfig, DatePolicy};
pub use converter::MarkdownConverter;
pub use error::{ChatdownError, Result};
pub use export::{Export, Message};
pub use progress::{BatchEvent, ProcessResult, Progress};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chatdown::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ChatdownError, Result};

    pub use crate::export::{Export, Message, MessageKind, Span, SpanKind, Text, TextNode};

    pub use crate::config::{BatchConfig, ConvertConfig, DatePolicy};
    pub use crate::converter::MarkdownConverter;
    pub use crate::markdown::escape_markdown;

    pub use crate::batch::{BatchProcessor, RunHandle};
    pub use crate::discovery::{scan_directory, validate_directory};
    pub use crate::job::{JobDescriptor, destination_path};
    pub use crate::progress::{
        BatchEvent, EventCallback, FileError, ProcessResult, Progress, channel_events,
        log_events, no_events,
    };
}
