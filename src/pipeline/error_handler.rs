use log::{info, warn};
use std::path::Path;

use crate::SkipRecord;
use crate::utils::config::ReportConsts;

use super::context::PipelineContext;

fn display_relative<'a>(path: &'a Path, root: &Path) -> std::path::Display<'a> {
    path.strip_prefix(root).unwrap_or(path).display()
}

/// Log paths excluded by skip patterns: every directory, and the first few files plus a remainder count.
pub fn report_skip_stats(root: &Path, skipped_dirs: &[SkipRecord], skipped_files: &[SkipRecord]) {
    if !skipped_dirs.is_empty() {
        info!("");
        info!("Skipped {} directories:", skipped_dirs.len());
        for rec in skipped_dirs {
            info!("  - {} [{}]", display_relative(&rec.path, root), rec.pattern);
        }
    }
    if !skipped_files.is_empty() {
        info!("");
        info!("Skipped {} files:", skipped_files.len());
        for rec in skipped_files.iter().take(ReportConsts::SKIPPED_FILES_SHOWN) {
            info!("  - {} [{}]", display_relative(&rec.path, root), rec.pattern);
        }
        if skipped_files.len() > ReportConsts::SKIPPED_FILES_SHOWN {
            info!(
                "  ... and {} more files",
                skipped_files.len() - ReportConsts::SKIPPED_FILES_SHOWN
            );
        }
    }
}

/// Warn about paths the walker could not read. Call after both walks are done.
pub fn report_walk_errors(ctx: &PipelineContext, verbose: bool) {
    let errors = ctx.walk_errors.lock().unwrap_or_else(|e| e.into_inner());
    if errors.is_empty() {
        return;
    }
    warn!(
        "Skipped {} paths due to permission errors or access issues",
        errors.len()
    );
    if verbose {
        for (p, msg) in errors.iter() {
            warn!("  skipped: {} ({})", p.display(), msg);
        }
    }
}
