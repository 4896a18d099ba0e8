//! Pipeline context: roots, filters and error/skip state shared by the walks and the driver.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::Opts;
use crate::engine::tools::{PathFilter, check_root_and_canonicalize, output_root_for};

/// Shared context for one run. Built once in the driver; both walks (count and dispatch) read it,
/// so skip records and walk errors from either land in the same place.
pub struct PipelineContext {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub filter: PathFilter,
    pub strict: bool,
    pub follow_links: bool,
    pub first_error: Arc<Mutex<Option<String>>>,
    /// Paths the walker could not read (permission denied, symlink loop), with the error text.
    pub walk_errors: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl PipelineContext {
    /// Canonicalize the input root, derive the sibling output root, and parse skip patterns.
    /// Any problem here is a configuration error and nothing has been touched yet.
    pub fn new(input_root: &Path, opts: &Opts) -> Result<Self> {
        let input_root = check_root_and_canonicalize(input_root)?;
        let output_root = output_root_for(&input_root, &opts.output_suffix)?;
        let filter = PathFilter::from_opts(opts)?;
        Ok(Self {
            input_root,
            output_root,
            filter,
            strict: opts.strict,
            follow_links: opts.follow_links,
            first_error: Arc::new(Mutex::new(None)),
            walk_errors: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Path of `dir` relative to the input root (`""` for the root itself).
    pub fn relative(&self, dir: &Path) -> PathBuf {
        dir.strip_prefix(&self.input_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| dir.to_path_buf())
    }
}
