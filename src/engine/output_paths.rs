//! Mirror an input file into the output tree.

use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::utils::temp_path_for;

/// Final and in-progress locations for one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    /// Path relative to the input root (used in messages).
    pub relative: PathBuf,
    pub output_path: PathBuf,
    pub temp_path: PathBuf,
}

/// Compute `output_root/<relative dir>/<stem>.<output_extension>` and its temp sibling,
/// creating the output directory if needed. Same inputs always give the same paths.
pub fn map_output(
    input_path: &Path,
    input_root: &Path,
    output_root: &Path,
    output_extension: &str,
) -> Result<OutputPaths, ConvertError> {
    let relative = input_path
        .strip_prefix(input_root)
        .map_err(|_| ConvertError::InvalidInput {
            path: input_path.to_path_buf(),
            root: input_root.to_path_buf(),
        })?
        .to_path_buf();
    let (Some(stem), Some(source_name)) = (input_path.file_stem(), input_path.file_name()) else {
        return Err(ConvertError::InvalidInput {
            path: input_path.to_path_buf(),
            root: input_root.to_path_buf(),
        });
    };

    let output_dir = match relative.parent() {
        Some(parent) => output_root.join(parent),
        None => output_root.to_path_buf(),
    };
    std::fs::create_dir_all(&output_dir)?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(output_extension);
    let output_path = output_dir.join(file_name);
    let temp_path = temp_path_for(&output_path, &source_name.to_string_lossy());

    Ok(OutputPaths {
        relative,
        output_path,
        temp_path,
    })
}
