//! Tree collection: the full recursive walk (for the total count) and the one-level listing
//! the driver dispatches from. Both visit entries in file-name order.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::codec::has_supported_extension;

use super::context::PipelineContext;

/// One walked entry with the file type already resolved.
pub(crate) struct WalkEntry {
    pub(crate) path: PathBuf,
    pub(crate) is_dir: bool,
    pub(crate) is_file: bool,
}

/// One result from a directory walk: either an entry to consider or an error with optional path.
pub(crate) enum WalkOutcome {
    Ok(WalkEntry),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub(crate) fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let ft = entry.file_type();
            WalkOutcome::Ok(WalkEntry {
                is_dir: ft.is_dir(),
                is_file: ft.is_file(),
                path: entry.into_path(),
            })
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Record a walk error. Strict mode keeps the first one and stops the caller; otherwise the
/// path is logged and remembered for the end-of-run report.
fn handle_walk_error(
    ctx: &PipelineContext,
    msg: String,
    path: Option<PathBuf>,
    last_path: &Option<PathBuf>,
) -> Result<()> {
    if ctx.strict {
        let first = ctx
            .first_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert_with(|| msg.clone())
            .clone();
        bail!("strict mode: {}", first);
    }
    log::warn!("Permission denied or error accessing path: {}", msg);
    // Record every error (path or synthetic line so errors with no path are counted).
    let to_push = path.unwrap_or_else(|| {
        PathBuf::from(format!(
            "<no-path, last was {}>",
            last_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".to_string())
        ))
    });
    let mut errors = ctx.walk_errors.lock().unwrap_or_else(|e| e.into_inner());
    if !errors.iter().any(|(p, _)| *p == to_push) {
        errors.push((to_push, msg));
    }
    Ok(())
}

/// True if `entry` is a file with a supported extension that no file pattern excludes.
/// The extension is checked first so unrelated dot files are not reported as skipped.
fn is_eligible_file(ctx: &PipelineContext, entry: &WalkEntry, extensions: &[&str]) -> bool {
    entry.is_file
        && has_supported_extension(&entry.path, extensions)
        && !ctx.filter.should_skip_file(&entry.path)
}

/// Every eligible file under the input root, depth-first in name order. Skipped directories are not entered.
pub fn collect_all(ctx: &PipelineContext, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let iter = WalkDir::new(&ctx.input_root)
        .follow_links(ctx.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !e.file_type().is_dir() || !ctx.filter.should_skip_dir(e.path())
        })
        .map(to_outcome_walkdir);

    let mut files = Vec::new();
    let mut last_path: Option<PathBuf> = None;
    for outcome in iter {
        match outcome {
            WalkOutcome::Ok(entry) => {
                if is_eligible_file(ctx, &entry, extensions) {
                    files.push(entry.path.clone());
                }
                last_path = Some(entry.path);
            }
            WalkOutcome::Err { msg, path } => handle_walk_error(ctx, msg, path, &last_path)?,
        }
    }
    Ok(files)
}

/// Immediate children of `dir`: eligible files and non-skipped subdirectories, each in name order.
pub fn collect_one_level(
    ctx: &PipelineContext,
    dir: &Path,
    extensions: &[&str],
) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let iter = WalkDir::new(dir)
        .follow_links(ctx.follow_links)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(to_outcome_walkdir);

    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    let mut last_path: Option<PathBuf> = None;
    for outcome in iter {
        match outcome {
            WalkOutcome::Ok(entry) => {
                if entry.is_dir {
                    if !ctx.filter.should_skip_dir(&entry.path) {
                        subdirs.push(entry.path.clone());
                    }
                } else if is_eligible_file(ctx, &entry, extensions) {
                    files.push(entry.path.clone());
                }
                last_path = Some(entry.path);
            }
            WalkOutcome::Err { msg, path } => handle_walk_error(ctx, msg, path, &last_path)?,
        }
    }
    Ok((files, subdirs))
}
