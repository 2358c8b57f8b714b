//! # chatdown CLI
//!
//! Command-line interface for the chatdown library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use chatdown::cli::{Args, exit_code};
use chatdown::discovery::{scan_directory, validate_directory};
use chatdown::progress::{BatchEvent, Progress, channel_events};
use chatdown::{BatchProcessor, ChatdownError, MarkdownConverter, ProcessResult};

#[tokio::main]
async fn main() {
    let args = <Args as ClapParser>::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(result) => match exit_code(&result) {
            0 => {}
            code => process::exit(code),
        },
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(args: &Args) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<ProcessResult, ChatdownError> {
    let total_start = Instant::now();
    let batch_config = args.batch_config();

    println!("📝 chatdown v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:       {}", args.directory.display());
    if batch_config.include_subdirs {
        println!("🔁 Mode:        Recursive");
    }
    println!("⚙️  Workers:     {}", batch_config.effective_concurrency());
    println!();

    validate_directory(&args.directory)?;

    println!("🔍 Scanning for exports...");
    let jobs = scan_directory(&args.directory, batch_config.include_subdirs)?;
    let total_bytes: u64 = jobs.iter().map(|job| job.size_bytes).sum();
    println!("   Found {} files ({})", jobs.len(), format_bytes(total_bytes));

    let total_files = jobs.len();
    let (events, mut rx) = channel_events();
    let converter = MarkdownConverter::with_config(args.convert_config());
    let processor = BatchProcessor::new(converter).with_events(events);

    let handle = processor.start(jobs, &batch_config)?;
    println!("⏳ Converting...");

    let interrupt = processor.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Cancelling, waiting for running conversions...");
            let _ = interrupt.cancel();
        }
    });

    let bar = progress_bar(total_files);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Progress(progress) => show_progress(&bar, &progress),
                BatchEvent::Complete(_) => break,
            }
        }
        bar.finish_and_clear();
    });

    let result = handle.wait().await?;
    let _ = printer.await;

    print_summary(&result, total_start);
    Ok(result)
}

fn progress_bar(total_files: usize) -> ProgressBar {
    let pb = ProgressBar::new(total_files as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn show_progress(bar: &ProgressBar, progress: &Progress) {
    bar.set_position(progress.processed_files as u64);
    bar.set_message(format!(
        "{} (ETA {:.1}s)",
        progress.current_file,
        progress.estimated_remaining.as_secs_f64()
    ));
}

fn print_summary(result: &ProcessResult, total_start: Instant) {
    println!();
    if result.cancelled {
        println!("⏹️  Cancelled after {} of {} files", result.attempted(), result.total_files);
    } else if result.success {
        println!("✅ Done! Markdown written next to each export");
    } else {
        println!("⚠️  Finished with {} failed files", result.error_count);
    }

    println!();
    println!("📊 Summary:");
    println!("   Converted: {} files", result.success_count);
    println!("   Failed:    {} files", result.error_count);
    if result.skipped_count > 0 {
        println!("   Skipped:   {} files", result.skipped_count);
    }
    println!("   Data:      {}", format_bytes(result.processed_bytes));

    if !result.errors.is_empty() {
        println!();
        println!("❌ Failures:");
        for failure in &result.errors {
            println!("   {}: {}", failure.path.display(), failure.message);
        }
    }

    let total_time = total_start.elapsed();
    println!();
    println!("⚡ Performance:");
    println!("   Total time:  {:.2}s", total_time.as_secs_f64());
    println!("   Run time:    {:.2}s", result.duration.as_secs_f64());
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
