//! Bounded-concurrency batch upload over any [`Uploader`].

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{FileInput, UploadDescriptor, UploadError, Uploader};

use super::error::BatchError;
use super::types::{BatchOptions, BatchOutcome, BatchProgress, BatchReport};

type Queue = Arc<Mutex<VecDeque<(usize, FileInput)>>>;

/// Start uploading `files` with at most `options.concurrency` in flight.
///
/// Returns immediately; outcomes arrive through the returned [`BatchRun`]
/// as files finish. Every submitted file produces exactly one outcome.
///
/// # Errors
///
/// Returns [`BatchError::InvalidConcurrency`] for a concurrency of zero and
/// [`BatchError::NoRuntime`] when called outside a Tokio runtime.
pub fn run_batch<U>(
    client: Arc<U>,
    files: Vec<FileInput>,
    options: BatchOptions,
) -> Result<BatchRun, BatchError>
where
    U: Uploader + 'static,
{
    if options.concurrency == 0 {
        return Err(BatchError::InvalidConcurrency(0));
    }
    let handle = Handle::try_current().map_err(|_| BatchError::NoRuntime)?;

    let total = files.len();
    let workers = options.concurrency.min(total);
    let cancel = options.cancel.child_token();
    let queue: Queue = Arc::new(Mutex::new(files.into_iter().enumerate().collect()));
    let completed = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel(total.max(1));

    info!(
        files = total,
        concurrency = options.concurrency,
        workers,
        "Starting batch upload"
    );

    for worker in 1..=workers {
        handle.spawn(worker_loop(
            worker,
            Arc::clone(&client),
            Arc::clone(&queue),
            cancel.clone(),
            Arc::clone(&completed),
            tx.clone(),
        ));
    }

    Ok(BatchRun {
        rx,
        completed,
        total,
        cancel,
        started: Instant::now(),
    })
}

/// Run a batch to completion.
///
/// # Errors
///
/// Same as [`run_batch`].
pub async fn upload_all<U>(
    client: Arc<U>,
    files: Vec<FileInput>,
    options: BatchOptions,
) -> Result<BatchReport, BatchError>
where
    U: Uploader + 'static,
{
    Ok(run_batch(client, files, options)?.collect().await)
}

/// Handle to a running batch.
///
/// Dropping the handle cancels whatever has not finished yet.
pub struct BatchRun {
    rx: mpsc::Receiver<BatchOutcome>,
    completed: Arc<AtomicUsize>,
    total: usize,
    cancel: CancellationToken,
    started: Instant,
}

impl BatchRun {
    /// Next finished file, or `None` once every outcome has been delivered.
    pub async fn next(&mut self) -> Option<BatchOutcome> {
        self.rx.recv().await
    }

    /// Snapshot of finished/total files.
    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total,
        }
    }

    /// Stop the run. In-flight uploads end as cancelled, unclaimed files
    /// are reported cancelled without being uploaded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain the remaining outcomes into a report.
    pub async fn collect(mut self) -> BatchReport {
        let mut outcomes = Vec::with_capacity(self.total);
        while let Some(outcome) = self.next().await {
            outcomes.push(outcome);
        }

        let report = BatchReport {
            outcomes,
            elapsed: self.started.elapsed(),
        };
        info!(
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            bytes = report.uploaded_bytes(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Batch upload finished"
        );
        report
    }
}

impl Drop for BatchRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn worker_loop<U>(
    worker: usize,
    client: Arc<U>,
    queue: Queue,
    cancel: CancellationToken,
    completed: Arc<AtomicUsize>,
    tx: mpsc::Sender<BatchOutcome>,
) where
    U: Uploader + 'static,
{
    loop {
        let Some((index, file)) = queue.lock().await.pop_front() else {
            break;
        };

        let filename = file.filename().to_string();
        let size = file.size();
        let started = Instant::now();

        let result = if cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            upload_one(&client, file, &cancel).await
        };

        match &result {
            Ok(descriptor) => {
                debug!(worker, filename = %filename, key = %descriptor.key, "Batch file uploaded");
            }
            Err(e) => warn!(worker, filename = %filename, error = %e, "Batch file failed"),
        }

        let outcome = BatchOutcome {
            index,
            filename,
            size,
            result,
            duration: started.elapsed(),
            worker,
        };

        completed.fetch_add(1, Ordering::SeqCst);
        if tx.send(outcome).await.is_err() {
            // Receiver gone; the run was dropped.
            break;
        }
    }
}

/// Upload on its own task so a panicking backend only fails this file.
async fn upload_one<U>(
    client: &Arc<U>,
    file: FileInput,
    cancel: &CancellationToken,
) -> Result<UploadDescriptor, UploadError>
where
    U: Uploader + 'static,
{
    let client = Arc::clone(client);
    let cancel = cancel.clone();
    let task = tokio::spawn(async move { client.upload_cancellable(file, &cancel).await });

    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(UploadError::Aborted(panic_message(&*e.into_panic()))),
        Err(e) => Err(UploadError::Aborted(e.to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "upload task panicked".to_string()
    }
}
