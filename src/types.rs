//! Public and internal types for the mediashrink API and pipeline.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::codec::Encoder;
use crate::error::ConvertError;

/// One file to convert. Built by the driver per discovered file and consumed by exactly one worker.
///
/// The codec parameters (quality, bitrate, preset) live inside `encoder`; the core never looks at them.
#[derive(Clone)]
pub struct FileTask {
    pub input_path: PathBuf,
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub encoder: Arc<dyn Encoder>,
}

impl fmt::Debug for FileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTask")
            .field("input_path", &self.input_path)
            .field("input_root", &self.input_root)
            .field("output_root", &self.output_root)
            .field("encoder", &self.encoder.name())
            .finish()
    }
}

/// How a single task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Encoder ran and the temp file was published.
    Converted,
    /// Source was copied verbatim (e.g. bitrate already below target) and published.
    Copied,
    /// Output existed before the task started; encoder not invoked.
    AlreadyExists,
    /// Output appeared while we were encoding (another worker or process won); our temp was discarded.
    FinishedElsewhere,
    /// Encoder or filesystem failure. No file was left at the output path.
    Failed,
    /// Run was cancelled before this task started.
    Cancelled,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// Outcome of one [`FileTask`]. Exactly one per task, failures included.
#[derive(Clone, Debug)]
pub struct TaskResult {
    pub status: TaskStatus,
    /// Human-readable line for the progress log.
    pub message: String,
    /// Source size in bytes. `Some` iff the task succeeded.
    pub original_size: Option<u64>,
    /// Size of the published output in bytes. `Some` iff the task succeeded.
    pub processed_size: Option<u64>,
    pub origin_file: PathBuf,
}

impl TaskResult {
    pub fn success(
        status: TaskStatus,
        origin_file: PathBuf,
        original_size: u64,
        processed_size: u64,
        message: String,
    ) -> Self {
        Self {
            status,
            message,
            original_size: Some(original_size),
            processed_size: Some(processed_size),
            origin_file,
        }
    }

    pub fn failed(origin_file: PathBuf, message: String) -> Self {
        Self {
            status: TaskStatus::Failed,
            message,
            original_size: None,
            processed_size: None,
            origin_file,
        }
    }

    pub fn cancelled(origin_file: PathBuf) -> Self {
        let message = format!("{} ({})", origin_file.display(), ConvertError::Cancelled);
        Self {
            status: TaskStatus::Cancelled,
            message,
            original_size: None,
            processed_size: None,
            origin_file,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Files of one directory, dispatched together. Lives only while that directory is processed.
#[derive(Clone, Debug)]
pub struct DirectoryBatch {
    pub directory_path: PathBuf,
    pub relative_path: PathBuf,
    pub file_list: Vec<PathBuf>,
}

/// A path excluded by a skip pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipRecord {
    pub path: PathBuf,
    /// The pattern that matched, as written in the configuration.
    pub pattern: String,
}

/// Running totals for one pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Successful results that carried sizes (converted, copied or already present).
    pub processed_files: usize,
    pub original_size_total: u64,
    pub processed_size_total: u64,
    /// Subset of `processed_files` that were newly written this run.
    pub converted_files: usize,
    /// Subset of `processed_files` whose output was already there.
    pub existing_files: usize,
    /// Failed or cancelled results.
    pub failed_files: usize,
}

impl RunStats {
    /// Bytes saved; negative when outputs are larger than their sources.
    pub fn saved_bytes(&self) -> i64 {
        self.original_size_total as i64 - self.processed_size_total as i64
    }

    pub fn saved_percent(&self) -> f64 {
        if self.original_size_total == 0 {
            0.0
        } else {
            self.saved_bytes() as f64 / self.original_size_total as f64 * 100.0
        }
    }
}

/// Which progress denominator to report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgressMode {
    /// Progress over the whole tree (count fixed up front).
    #[default]
    Global,
    /// Progress resets for every directory.
    PerDirectory,
}

/// How a run ended when it did not fail outright.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// No eligible files under the input root.
    NothingToDo,
    Finished(RunSummary),
}

/// Final report of a run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub total_files: usize,
    /// Number of TaskResults produced (equals `total_files` unless cancelled mid-run).
    pub results: usize,
    pub stats: RunStats,
    pub skipped_dirs: Vec<SkipRecord>,
    pub skipped_files: Vec<SkipRecord>,
    pub output_root: PathBuf,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

/// Full options for a run (CLI, config file, or lib callers).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Worker count override. When None, derived from core count and the encoder's limit.
    pub workers: Option<usize>,
    pub progress: ProgressMode,
    /// Directory skip patterns (`prefix*`, `*suffix`, or exact name).
    pub skip_dir_patterns: Vec<String>,
    /// File skip patterns, same syntax as directories.
    pub skip_file_patterns: Vec<String>,
    /// Appended to the input root's name to form the sibling output root.
    pub output_suffix: String,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Strict mode: fail on first walk error instead of skipping.
    pub strict: bool,
    pub verbose: bool,
    /// Run log file. When None, `<input dir>/<encoder>.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for Opts {
    fn default() -> Self {
        let paths = crate::utils::PackagePaths::get();
        Self {
            workers: None,
            progress: ProgressMode::Global,
            skip_dir_patterns: paths.default_skip_dir_patterns(),
            skip_file_patterns: paths.default_skip_file_patterns(),
            output_suffix: paths.output_suffix().to_string(),
            follow_links: true,
            strict: false,
            verbose: false,
            log_file: None,
        }
    }
}
