//! Batch options, outcomes and reports.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::storage::{UploadDescriptor, UploadError};

/// Default number of concurrent uploads.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// How a batch runs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum uploads in flight.
    pub concurrency: usize,
    /// Cancels every upload of the run.
    pub cancel: CancellationToken,
}

impl BatchOptions {
    /// Options with the given concurrency and a fresh token.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external cancellation token, e.g. one tied to Ctrl-C.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Result of one file in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the file in the submitted list.
    pub index: usize,
    /// Original filename.
    pub filename: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Upload result.
    pub result: Result<UploadDescriptor, UploadError>,
    /// Time spent on this file.
    pub duration: Duration,
    /// Worker that handled the file, starting at 1.
    pub worker: usize,
}

impl BatchOutcome {
    /// Whether the upload succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Completed/total snapshot of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Files with an outcome.
    pub completed: usize,
    /// Files submitted.
    pub total: usize,
}

impl BatchProgress {
    /// Whether every file has an outcome.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Every outcome of a finished batch plus wall-clock time.
#[derive(Debug)]
pub struct BatchReport {
    /// Outcomes in completion order.
    pub outcomes: Vec<BatchOutcome>,
    /// Time from start until the last outcome.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of files.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Successful uploads.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Failed uploads, cancellations included.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Uploads stopped by cancellation.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Err(e) if e.is_cancelled()))
            .count()
    }

    /// Bytes written by successful uploads.
    #[must_use]
    pub fn uploaded_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|d| d.size)
            .sum()
    }

    /// Mean time per file.
    #[must_use]
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.total()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.outcomes.iter().map(|o| o.duration).sum::<Duration>() / n,
        }
    }

    /// Percentage of files that succeeded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.total() as f64 * 100.0
    }

    /// Successful outcomes only.
    pub fn successes(&self) -> impl Iterator<Item = (&BatchOutcome, &UploadDescriptor)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|d| (o, d)))
    }

    /// Failed outcomes only.
    pub fn failures(&self) -> impl Iterator<Item = (&BatchOutcome, &UploadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }
}
