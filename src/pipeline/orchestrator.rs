use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::codec::Encoder;
use crate::engine::parallel::{Processor, WorkerPool};
use crate::engine::progress::{ProgressTracker, tracker_for};
use crate::engine::stats::StatsAccumulator;
use crate::engine::tools::format_size;
use crate::utils::config::WorkerLimits;
use crate::{DirectoryBatch, FileTask, Opts, RunOutcome, RunSummary};

use super::context::PipelineContext;
use super::error_handler::{report_skip_stats, report_walk_errors};
use super::walk::{collect_all, collect_one_level};

/// Where the driver is in a run. Exposed for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Init,
    CheckingDependencies,
    Counting,
    Traversing,
    Draining,
    Recursing,
    Reporting,
    Done,
}

/// Runs one encoder over a directory tree, one directory batch at a time.
pub struct PipelineDriver {
    encoder: Arc<dyn Encoder>,
    opts: Opts,
    cancel: Arc<AtomicBool>,
    processor: Option<Processor>,
    tracker: Option<Box<dyn ProgressTracker>>,
    state: DriverState,
}

/// Mutable pieces shared by every batch of one run.
struct RunParts<'a> {
    ctx: &'a PipelineContext,
    pool: &'a WorkerPool,
    tracker: &'a dyn ProgressTracker,
    stats: &'a StatsAccumulator,
    results: usize,
}

impl PipelineDriver {
    pub fn new(encoder: Arc<dyn Encoder>, opts: Opts) -> Self {
        Self {
            encoder,
            opts,
            cancel: Arc::new(AtomicBool::new(false)),
            processor: None,
            tracker: None,
            state: DriverState::Init,
        }
    }

    /// Share a cancel flag (set by a Ctrl+C handler, or by a test).
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the per-task callback (default: the standard conversion protocol).
    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Use `tracker` instead of the one built from `opts.progress`.
    pub fn with_tracker(mut self, tracker: Box<dyn ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn enter(&mut self, state: DriverState) {
        debug!("Driver state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Convert every eligible file under `root`. Configuration problems (bad root, bad pattern,
    /// missing tool) return `Err` before any file is touched; per-file failures never do.
    pub fn run(&mut self, root: &Path) -> Result<RunOutcome> {
        let start = Instant::now();
        self.enter(DriverState::Init);
        let ctx = PipelineContext::new(root, &self.opts)?;

        self.enter(DriverState::CheckingDependencies);
        self.encoder
            .probe()
            .with_context(|| format!("{} encoder is not available", self.encoder.name()))?;

        self.enter(DriverState::Counting);
        let encoder = Arc::clone(&self.encoder);
        let extensions = encoder.extensions();
        let total_files = collect_all(&ctx, extensions)?.len();
        if total_files == 0 {
            info!("No supported files found ({})", extensions.join(", "));
            report_walk_errors(&ctx, self.opts.verbose);
            self.enter(DriverState::Done);
            return Ok(RunOutcome::NothingToDo);
        }

        fs::create_dir_all(&ctx.output_root)
            .with_context(|| format!("create output root {}", ctx.output_root.display()))?;

        let workers = WorkerLimits::current().resolve(self.opts.workers, encoder.max_workers());
        let pool = match &self.processor {
            Some(p) => WorkerPool::with_processor(workers, Arc::clone(&self.cancel), Arc::clone(p))?,
            None => WorkerPool::new(workers, Arc::clone(&self.cancel))?,
        };
        let tracker = self
            .tracker
            .take()
            .unwrap_or_else(|| tracker_for(self.opts.progress, total_files));
        let stats = StatsAccumulator::new();

        info!("Processing with {} workers", pool.num_workers());
        info!("Output directory: {}", ctx.output_root.display());
        info!("Skip directory patterns: {}", join_patterns(ctx.filter.dir_patterns()));
        info!("Skip file patterns: {}", join_patterns(ctx.filter.file_patterns()));
        info!("Found {} files in total", total_files);

        let mut parts = RunParts {
            ctx: &ctx,
            pool: &pool,
            tracker: tracker.as_ref(),
            stats: &stats,
            results: 0,
        };
        let input_root = ctx.input_root.clone();
        self.traverse(&mut parts, &input_root)?;
        let results = parts.results;

        self.enter(DriverState::Reporting);
        let skipped_dirs = ctx.filter.skipped_dirs();
        let skipped_files = ctx.filter.skipped_files();
        report_skip_stats(&ctx.input_root, &skipped_dirs, &skipped_files);
        report_walk_errors(&ctx, self.opts.verbose);
        tracker.finish_all();

        let cancelled = self.cancel.load(Ordering::Relaxed);
        let stats = stats.snapshot();
        let elapsed_secs = start.elapsed().as_secs_f64();
        info!("");
        info!("Total time: {:.2} s", elapsed_secs);
        info!(
            "Processed {} files ({} converted, {} already present, {} failed)",
            stats.processed_files, stats.converted_files, stats.existing_files, stats.failed_files
        );
        if stats.processed_files > 0 {
            info!("Size before: {}", format_size(stats.original_size_total as i64));
            info!("Size after: {}", format_size(stats.processed_size_total as i64));
            info!(
                "Space saved: {} ({:.1}%)",
                format_size(stats.saved_bytes()),
                stats.saved_percent()
            );
        }
        if cancelled {
            warn!("Cancelled: {} of {} files got a result", results, total_files);
        }

        self.enter(DriverState::Done);
        Ok(RunOutcome::Finished(RunSummary {
            total_files,
            results,
            stats,
            skipped_dirs,
            skipped_files,
            output_root: ctx.output_root.clone(),
            cancelled,
            elapsed_secs,
        }))
    }

    /// Depth-first pre-order: a directory's own files are fully drained before any subdirectory starts.
    fn traverse(&mut self, parts: &mut RunParts<'_>, root: &Path) -> Result<()> {
        let encoder = Arc::clone(&self.encoder);
        let extensions = encoder.extensions();
        let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if self.cancel.load(Ordering::Relaxed) {
                warn!("Cancellation requested; not starting {}", dir.display());
                break;
            }
            self.enter(DriverState::Traversing);
            let (files, subdirs) = collect_one_level(parts.ctx, &dir, extensions)?;
            if !files.is_empty() {
                let batch = DirectoryBatch {
                    relative_path: parts.ctx.relative(&dir),
                    directory_path: dir,
                    file_list: files,
                };
                self.enter(DriverState::Draining);
                self.dispatch(parts, batch);
            }
            self.enter(DriverState::Recursing);
            stack.extend(subdirs.into_iter().rev());
        }
        Ok(())
    }

    fn dispatch(&self, parts: &mut RunParts<'_>, batch: DirectoryBatch) {
        let tracker = parts.tracker;
        let stats = parts.stats;
        tracker.start_directory(
            &batch.directory_path,
            &batch.relative_path,
            batch.file_list.len(),
        );
        let tasks: Vec<FileTask> = batch
            .file_list
            .into_iter()
            .map(|input_path| FileTask {
                input_path,
                input_root: parts.ctx.input_root.clone(),
                output_root: parts.ctx.output_root.clone(),
                encoder: Arc::clone(&self.encoder),
            })
            .collect();
        parts.results += parts.pool.run(tasks, |result| {
            tracker.update(&result);
            stats.record(&result);
        });
        tracker.finish_directory();
    }
}

fn join_patterns<T: std::fmt::Display>(patterns: &[T]) -> String {
    patterns
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience entry point: run `encoder` over `root` with `opts` and a private cancel flag.
pub fn run_pipeline(root: &Path, opts: &Opts, encoder: Arc<dyn Encoder>) -> Result<RunOutcome> {
    PipelineDriver::new(encoder, opts.clone()).run(root)
}
