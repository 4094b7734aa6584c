//! Concurrent batch uploads.
//!
//! A fixed pool of workers pulls files from a shared queue and pushes one
//! [`BatchOutcome`] per file into a channel the caller drains through
//! [`BatchRun`]. Per-file failures, panics included, stay in their outcome;
//! cancellation reaches in-flight uploads and every file not yet started.

mod error;
mod pipeline;
mod types;

pub use error::BatchError;
pub use pipeline::{BatchRun, run_batch, upload_all};
pub use types::{
    BatchOptions, BatchOutcome, BatchProgress, BatchReport, DEFAULT_CONCURRENCY,
};
