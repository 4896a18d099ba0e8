//! Encoder boundary: the pipeline only knows this trait. Concrete encoders shell out to
//! external tools and write to the temp path they are given; publishing is the core's job.

pub mod command;
pub mod hevc;
pub mod webp;

use std::path::Path;

use crate::error::ConvertError;

pub use hevc::{HevcEncoder, HevcParams};
pub use webp::{WebpEncoder, WebpParams};

/// What to do with one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodePlan {
    /// Run the encoder into the temp path.
    Encode,
    /// Copy the source into the temp path unchanged; `reason` goes into the log.
    Copy { reason: String },
}

/// One pluggable external encoder. Implementations must be shareable across worker threads.
pub trait Encoder: Send + Sync {
    /// Short name used for log file naming and messages (e.g. `webp`).
    fn name(&self) -> &str;

    /// Lower-case extensions with leading dot that this encoder accepts.
    fn extensions(&self) -> &[&str];

    /// Extension (without dot) of the output for `input`.
    fn output_extension(&self, input: &Path) -> String;

    /// Check the external tool once at startup.
    fn probe(&self) -> Result<(), ConvertError>;

    /// Upper bound on parallel workers for this encoder (e.g. `Some(1)` for a strictly sequential tool).
    fn max_workers(&self) -> Option<usize> {
        None
    }

    /// Decide between encoding and copying. Default: always encode.
    fn plan(&self, _input: &Path) -> EncodePlan {
        EncodePlan::Encode
    }

    /// Encode `input` into `temp_output`. Must never write anywhere else.
    fn encode(&self, input: &Path, temp_output: &Path) -> Result<(), ConvertError>;
}

/// True when `path` has one of `extensions` (case-insensitive, compared with leading dot).
pub fn has_supported_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let dotted = format!(".{}", ext.to_lowercase());
            extensions.iter().any(|e| *e == dotted)
        }
        None => false,
    }
}
