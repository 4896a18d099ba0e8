//! Progress reporting: one log line per finished task, against a per-directory or whole-tree denominator.

use log::{info, warn};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use crate::{ProgressMode, TaskResult};

/// `done/total` as reported by one [`ProgressTracker::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally {
    pub done: usize,
    pub total: usize,
}

impl Tally {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// Progress sink driven by the pipeline. `update` may be called from several threads at once.
pub trait ProgressTracker: Send + Sync {
    /// A directory batch of `file_count` files is about to be dispatched.
    fn start_directory(&self, dir: &Path, relative: &Path, file_count: usize);
    /// Record one finished task, log exactly one line for it, and return the tally it reported.
    fn update(&self, result: &TaskResult) -> Tally;
    fn finish_directory(&self);
    fn finish_all(&self);
}

/// Build the tracker for `mode`. `total_files` is the whole-tree count (ignored by per-directory mode).
pub fn tracker_for(mode: ProgressMode, total_files: usize) -> Box<dyn ProgressTracker> {
    match mode {
        ProgressMode::Global => Box::new(GlobalProgress::new(total_files)),
        ProgressMode::PerDirectory => Box::new(DirectoryProgress::new()),
    }
}

fn log_update(result: &TaskResult, label: &str, tally: Tally) {
    if result.is_success() {
        info!("✓ {} - {}: {} ({:.1}%)", result.message, label, tally, tally.percent());
    } else {
        warn!("✗ {} - {}: {} ({:.1}%)", result.message, label, tally, tally.percent());
    }
}

fn log_directory_start(relative: &Path, file_count: usize) {
    let shown = if relative.as_os_str().is_empty() {
        Path::new(".")
    } else {
        relative
    };
    info!("");
    info!("Processing directory: {}", shown.display());
    info!("Found {} files", file_count);
}

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    processed: usize,
    success: usize,
}

impl Counts {
    fn record(&mut self, result: &TaskResult) -> Tally {
        self.processed += 1;
        if result.is_success() {
            self.success += 1;
        }
        Tally {
            done: self.processed,
            total: self.total,
        }
    }

    fn success_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64 * 100.0
        }
    }
}

/// Denominator resets to each directory's own file count.
#[derive(Debug, Default)]
pub struct DirectoryProgress {
    counts: Mutex<Counts>,
}

impl DirectoryProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for DirectoryProgress {
    fn start_directory(&self, _dir: &Path, relative: &Path, file_count: usize) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts = Counts {
            total: file_count,
            ..Counts::default()
        };
        log_directory_start(relative, file_count);
    }

    fn update(&self, result: &TaskResult) -> Tally {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let tally = counts.record(result);
        log_update(result, "done", tally);
        tally
    }

    fn finish_directory(&self) {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        info!(
            "Directory done: {}/{} succeeded ({:.1}%)",
            counts.success,
            counts.total,
            counts.success_percent()
        );
    }

    fn finish_all(&self) {}
}

/// Denominator fixed up front to the whole tree's file count; never decreases.
#[derive(Debug)]
pub struct GlobalProgress {
    counts: Mutex<Counts>,
}

impl GlobalProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            counts: Mutex::new(Counts {
                total: total_files,
                ..Counts::default()
            }),
        }
    }
}

impl ProgressTracker for GlobalProgress {
    fn start_directory(&self, _dir: &Path, relative: &Path, file_count: usize) {
        log_directory_start(relative, file_count);
    }

    fn update(&self, result: &TaskResult) -> Tally {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let tally = counts.record(result);
        log_update(result, "overall", tally);
        tally
    }

    fn finish_directory(&self) {}

    fn finish_all(&self) {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        info!("");
        info!(
            "All done: {}/{} succeeded ({:.1}%)",
            counts.success,
            counts.total,
            counts.success_percent()
        );
    }
}
