//! Progress and outcome reporting.
//!
//! The compressor and batch walker never print. They emit [`ReportEvent`]s to
//! an injected [`Reporter`]; the CLI renders them on the console, tests record
//! them, and library callers can discard them.

use crate::batch::BatchSummary;
use crate::constants::{
    PROGRESS_SPINNER_TEMPLATE, SCAN_PREFIX, SKIP_PREFIX, SPINNER_TICK_MS, START_PREFIX,
    SUCCESS_PREFIX, SUMMARY_PREFIX, UNSUPPORTED_PREFIX,
};
use crate::processing::{CompressionResult, Outcome};
use crate::search::Trial;
use crate::utils::{calculate_compression_ratio, format_file_size};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A directory walk started at `root`
    Scanning { root: PathBuf },
    /// A file without a supported extension was seen and not attempted
    Unsupported { path: PathBuf },
    /// A directory entry could not be read; the walk continues
    WalkFailed {
        path: Option<PathBuf>,
        message: String,
    },
    /// Compression of one file started
    Started { path: PathBuf },
    /// Alpha is being discarded to re-encode as JPEG
    TransparencyDropped { path: PathBuf },
    /// One trial encode of the quality search
    Trial {
        path: PathBuf,
        trial: Trial,
        target_bytes: u64,
    },
    /// Compression of one file finished, whatever the outcome
    Finished(CompressionResult),
    /// A directory walk finished
    BatchFinished(BatchSummary),
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: ReportEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: ReportEvent) {}
}

/// Keeps every event in memory for later assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Per-file results in the order they finished
    pub fn results(&self) -> Vec<CompressionResult> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Finished(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn trials(&self) -> Vec<Trial> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Trial { trial, .. } => Some(trial),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: ReportEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Renders events as console lines, with a spinner while a file is being
/// searched.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&self, message: String) {
        if crate::logger::is_quiet() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn clear_spinner(&self) {
        if let Some(pb) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_and_clear();
        }
    }

    /// Runs `print` without the spinner drawing over its output
    fn above_spinner(&self, print: impl FnOnce()) {
        let guard = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }

    fn print_result(&self, result: &CompressionResult) {
        let name = display_name(&result.input_path);
        let final_size = result.final_size.map(format_file_size).unwrap_or_default();

        match &result.outcome {
            Outcome::Skipped => {
                crate::info!("{} {} is already under target size. Skipping.", SKIP_PREFIX, name);
            }
            Outcome::Success => {
                let output = result
                    .output_path
                    .as_deref()
                    .map(display_name)
                    .unwrap_or_default();
                let quality = result.quality_used.unwrap_or_default();
                let saved = match (result.original_size, result.final_size) {
                    (Some(original), Some(compressed)) => {
                        calculate_compression_ratio(original, compressed)
                    }
                    _ => 0.0,
                };
                crate::info!(
                    "{} {} → {} ({} @ quality {}, {:.1}% smaller)",
                    SUCCESS_PREFIX,
                    name,
                    output,
                    final_size,
                    quality,
                    saved
                );
            }
            Outcome::SuccessOverTarget => {
                crate::warn!(
                    "{} compressed to {} but not under target. Saved anyway.",
                    name,
                    final_size
                );
            }
            Outcome::Failed => {
                crate::error!("Could not compress {} to target size.", name);
            }
            Outcome::Error(message) => {
                crate::error!("Error processing {}: {}", name, message);
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: ReportEvent) {
        match event {
            ReportEvent::Scanning { root } => {
                crate::info!("\n{} Scanning folder: {}", SCAN_PREFIX, root.display());
            }
            ReportEvent::Unsupported { path } => {
                crate::info!("{} Skipping unsupported file: {}", UNSUPPORTED_PREFIX, display_name(&path));
            }
            ReportEvent::WalkFailed { path, message } => match path {
                Some(path) => crate::warn!("Cannot read {}: {}", path.display(), message),
                None => crate::warn!("Directory walk error: {}", message),
            },
            ReportEvent::Started { path } => {
                self.start_spinner(format!("{} Compressing: {}", START_PREFIX, path.display()));
            }
            ReportEvent::TransparencyDropped { path } => {
                self.above_spinner(|| {
                    crate::warn!(
                        "{} has transparency. Flattening and converting to JPEG.",
                        display_name(&path)
                    );
                });
            }
            ReportEvent::Trial {
                trial,
                target_bytes,
                ..
            } => {
                self.above_spinner(|| {
                    crate::verbose!(
                        "quality {:>3}: {} (target {}) {}",
                        trial.quality,
                        format_file_size(trial.size),
                        format_file_size(target_bytes),
                        if trial.accepted { "fits" } else { "too large" }
                    );
                });
            }
            ReportEvent::Finished(result) => {
                self.clear_spinner();
                self.print_result(&result);
            }
            ReportEvent::BatchFinished(summary) => {
                crate::info!(
                    "\n{} Compression summary: {}/{} succeeded, {} failed, {} skipped, {} unsupported.",
                    SUMMARY_PREFIX,
                    summary.success_count,
                    summary.total_files,
                    summary.fail_count,
                    summary.skipped_count,
                    summary.unsupported_count
                );
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
