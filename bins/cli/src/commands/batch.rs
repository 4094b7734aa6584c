//! `depot batch`: upload every matching file in a directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use depot_core::batch::{BatchOptions, BatchReport, DEFAULT_CONCURRENCY, run_batch};
use depot_core::storage::FileInput;

use super::Context;
use crate::discovery::{find_files, wildcard_to_regex};
use crate::format::{format_size, format_throughput};

/// Options for `depot batch`.
#[derive(Debug, Args)]
pub struct BatchCommand {
    /// Directory to scan
    dir: PathBuf,

    /// File name wildcard (`*` and `?`)
    #[arg(short, long, default_value = "*")]
    pattern: String,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Number of concurrent uploads
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// List matching files without uploading
    #[arg(long)]
    dry_run: bool,

    /// Print every result as it arrives
    #[arg(short, long)]
    verbose: bool,
}

impl BatchCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        if !self.dir.is_dir() {
            bail!("directory not found: {}", self.dir.display());
        }

        let pattern = wildcard_to_regex(&self.pattern)?;
        let paths = find_files(&self.dir, &pattern, self.recursive)?;
        if paths.is_empty() {
            println!("No files matching '{}' in {}", self.pattern, self.dir.display());
            return Ok(());
        }

        println!(
            "{} {} ({} files matching '{}')",
            style("Scanning").cyan().bold(),
            self.dir.display(),
            paths.len(),
            self.pattern
        );

        let mut inputs = Vec::with_capacity(paths.len());
        for path in &paths {
            let input = FileInput::from_path(path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            inputs.push(input);
        }

        if self.dry_run {
            for (path, input) in paths.iter().zip(&inputs) {
                println!("  {} ({})", path.display(), format_size(input.size()));
            }
            let total: u64 = inputs.iter().map(FileInput::size).sum();
            println!("{} {}", style("Total size:").dim(), format_size(total));
            return Ok(());
        }

        let client = Arc::new(ctx.client()?);
        let total_size: u64 = inputs.iter().map(FileInput::size).sum();

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling remaining uploads");
                on_signal.cancel();
            }
        });

        let started = Instant::now();
        let mut run = run_batch(
            client,
            inputs,
            BatchOptions::new(self.concurrency).with_cancel(cancel),
        )?;

        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("invalid progress template")?
                .progress_chars("#>-"),
        );

        let mut outcomes = Vec::with_capacity(paths.len());
        while let Some(outcome) = run.next().await {
            pb.inc(1);
            pb.set_message(outcome.filename.clone());
            if self.verbose {
                match &outcome.result {
                    Ok(descriptor) => pb.println(format!(
                        "  {} {} -> {} [worker {}]",
                        style("ok").green(),
                        outcome.filename,
                        descriptor.url,
                        outcome.worker
                    )),
                    Err(e) => pb.println(format!(
                        "  {} {}: {e}",
                        style("failed").red(),
                        outcome.filename
                    )),
                }
            }
            outcomes.push(outcome);
        }
        pb.finish_and_clear();

        outcomes.sort_by_key(|o| o.index);
        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        print_summary(&report, total_size);

        if report.failed() > 0 {
            bail!("{} of {} uploads failed", report.failed(), report.total());
        }
        Ok(())
    }
}

fn print_summary(report: &BatchReport, total_size: u64) {
    println!();
    println!("{}", style("Batch upload finished").bold());
    println!("  Files:      {}", report.total());
    println!("  Succeeded:  {}", style(report.succeeded()).green());
    println!("  Failed:     {}", style(report.failed()).red());
    if report.cancelled() > 0 {
        println!("  Cancelled:  {}", report.cancelled());
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Uploaded:   {}", format_size(report.uploaded_bytes()));
    println!("  Elapsed:    {:.2}s", report.elapsed.as_secs_f64());
    println!(
        "  Average:    {:.2}s per file",
        report.average_duration().as_secs_f64()
    );
    if let Some(throughput) = format_throughput(report.uploaded_bytes(), report.elapsed) {
        println!("  Throughput: {throughput}");
    }

    if report.failed() > 0 {
        println!("  Success:    {:.1}%", report.success_rate());
        println!();
        println!("{}", style("Failures:").red().bold());
        for (outcome, err) in report.failures() {
            println!("  {}: {err}", outcome.filename);
        }
    }
}
