//! Single-file conversion protocol: existence check, temp write, re-check, atomic publish.
//!
//! Whatever happens to a worker, `output_path` is either absent or a complete conversion.
//! The encoder only ever writes to the temp path; a guard removes the temp file on every
//! failure path (including a panic unwinding through the encoder), and a stale temp left
//! by a killed process is deleted before the next attempt.

use log::debug;
use std::path::{Path, PathBuf};

use crate::codec::EncodePlan;
use crate::engine::output_paths::{OutputPaths, map_output};
use crate::engine::tools::format_size;
use crate::error::ConvertError;
use crate::utils::{discard_temp, remove_stale_temp, rename_temp_to_final};
use crate::{FileTask, TaskResult, TaskStatus};

/// Removes the temp file on drop unless the file was published.
struct TempGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> TempGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            discard_temp(self.path);
        }
    }
}

/// Convert one file. Never fails: errors become a failed [`TaskResult`] whose message carries the cause.
pub fn process_file(task: &FileTask) -> TaskResult {
    match convert(task) {
        Ok(result) => result,
        Err(e) => {
            let rel = task
                .input_path
                .strip_prefix(&task.input_root)
                .unwrap_or(&task.input_path);
            TaskResult::failed(task.input_path.clone(), format!("{} ({})", rel.display(), e))
        }
    }
}

fn convert(task: &FileTask) -> Result<TaskResult, ConvertError> {
    let encoder = &task.encoder;
    let paths = map_output(
        &task.input_path,
        &task.input_root,
        &task.output_root,
        &encoder.output_extension(&task.input_path),
    )?;

    if paths.output_path.exists() {
        return size_result(task, &paths, TaskStatus::AlreadyExists);
    }

    remove_stale_temp(&paths.temp_path)?;
    let mut guard = TempGuard::new(&paths.temp_path);

    let status = match encoder.plan(&task.input_path) {
        EncodePlan::Encode => {
            encoder.encode(&task.input_path, &paths.temp_path)?;
            TaskStatus::Converted
        }
        EncodePlan::Copy { reason } => {
            debug!("Copying {} instead of encoding: {}", paths.relative.display(), reason);
            std::fs::copy(&task.input_path, &paths.temp_path)?;
            TaskStatus::Copied
        }
    };
    if !paths.temp_path.is_file() {
        return Err(ConvertError::NoOutput {
            tool: encoder.name().to_string(),
            path: paths.temp_path.clone(),
        });
    }

    // Another worker or process may have published the same output while we were encoding.
    if paths.output_path.exists() {
        drop(guard);
        return size_result(task, &paths, TaskStatus::FinishedElsewhere);
    }
    rename_temp_to_final(&paths.temp_path, &paths.output_path)?;
    guard.disarm();
    size_result(task, &paths, status)
}

/// Success result with source/output sizes read from disk.
fn size_result(
    task: &FileTask,
    paths: &OutputPaths,
    status: TaskStatus,
) -> Result<TaskResult, ConvertError> {
    let original = std::fs::metadata(&task.input_path)?.len();
    let processed = std::fs::metadata(&paths.output_path)?.len();
    let message = size_message(&paths.relative, original, processed, status);
    Ok(TaskResult::success(
        status,
        PathBuf::from(&task.input_path),
        original,
        processed,
        message,
    ))
}

/// `photos/a.jpg (1.20 MB -> 300.00 KB) saved 900.00 KB`, plus a note for non-conversions.
pub fn size_message(relative: &Path, original: u64, processed: u64, status: TaskStatus) -> String {
    let saved = original as i64 - processed as i64;
    let note = match status {
        TaskStatus::AlreadyExists => " (already exists, skipped)",
        TaskStatus::FinishedElsewhere => " (finished by another worker)",
        TaskStatus::Copied => " (copied, bitrate already below target)",
        _ => "",
    };
    format!(
        "{} ({} -> {}) saved {}{}",
        relative.display(),
        format_size(original as i64),
        format_size(processed as i64),
        format_size(saved),
        note
    )
}
