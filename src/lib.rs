//! mediashrink: batch-convert a directory tree of media files into a mirrored sibling tree.

pub mod codec;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use codec::{EncodePlan, Encoder};
pub use error::ConvertError;

use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Result alias used by public mediashrink API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: convert every file under `root` that `encoder` accepts into
/// `<root>_compressed` (or `opts.output_suffix`), mirroring the tree.
///
/// Returns [`RunOutcome::NothingToDo`] when no eligible file exists. Configuration problems
/// (unreadable root, malformed skip pattern, missing external tool) are errors; per-file
/// failures are reported in the summary instead.
///
/// ```ignore
/// let encoder = Arc::new(mediashrink::codec::WebpEncoder::new(Default::default())?);
/// let outcome = mediashrink::shrink_dir(Path::new("photos"), &Opts::default(), encoder)?;
/// ```
pub fn shrink_dir(root: &Path, opts: &Opts, encoder: Arc<dyn Encoder>) -> Result<RunOutcome> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::run_pipeline(root, opts, encoder)
}
