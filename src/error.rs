//! Error kinds for dependency probing and single-file conversion.

use std::path::PathBuf;

/// Failures of the encoder boundary. Dependency errors abort the run; everything else
/// is turned into a failed [`TaskResult`](crate::TaskResult) by the worker.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("{tool} not found. Please install it first ({hint})")]
    MissingDependency { tool: String, hint: String },

    #[error("{path} is not under input root {root}")]
    InvalidInput { path: PathBuf, root: PathBuf },

    #[error("error code {}: {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("{tool} exited successfully but produced no output at {path}")]
    NoOutput { tool: String, path: PathBuf },

    #[error("cancelled")]
    Cancelled,

    #[error("error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error: {0:#}")]
    Other(#[from] anyhow::Error),
}
