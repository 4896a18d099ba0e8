use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

/// In-progress sibling of `output_path` for the given source file name:
/// `<source file name>.tmp.<output extension>`. The output extension stays last so
/// encoders that pick a container from the file name keep working.
pub fn temp_path_for(output_path: &Path, source_name: &str) -> PathBuf {
    let marker = PackagePaths::get().temp_marker();
    let name = match output_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{source_name}.{marker}.{ext}"),
        None => format!("{source_name}.{marker}"),
    };
    output_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(name)
}

/// Remove a temp file if present. Missing is fine.
pub fn remove_stale_temp(temp_path: &Path) -> Result<()> {
    match fs::remove_file(temp_path) {
        Ok(()) => {
            log::debug!("Removed stale temp file {}", temp_path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("remove stale temp file {}", temp_path.display()))
        }
    }
}

/// Best-effort temp cleanup on failure paths; the original error is what gets reported.
pub fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path)
        && e.kind() != ErrorKind::NotFound
    {
        log::warn!("Could not remove temp file {}: {}", temp_path.display(), e);
    }
}

/// Publish a finished temp file at its final path (atomic rename on the same filesystem).
pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "atomic rename temp file to final path ({} -> {})",
            temp_path.display(),
            final_path.display()
        )
    })
}
