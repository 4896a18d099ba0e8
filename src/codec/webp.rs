//! Image → WebP through `cwebp`.

use std::path::Path;
use std::process::Command;

use super::Encoder;
use super::command::{run_tool, tool_available};
use crate::error::ConvertError;

const CWEBP: &str = "cwebp";
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".heic", ".heif"];

/// `cwebp` settings.
#[derive(Clone, Debug)]
pub struct WebpParams {
    /// 0-100.
    pub quality: u8,
}

impl Default for WebpParams {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

pub struct WebpEncoder {
    params: WebpParams,
}

impl WebpEncoder {
    pub fn new(params: WebpParams) -> anyhow::Result<Self> {
        if params.quality > 100 {
            anyhow::bail!("WebP quality must be between 0 and 100");
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &WebpParams {
        &self.params
    }
}

impl Encoder for WebpEncoder {
    fn name(&self) -> &str {
        "webp"
    }

    fn extensions(&self) -> &[&str] {
        IMAGE_EXTENSIONS
    }

    fn output_extension(&self, _input: &Path) -> String {
        "webp".to_string()
    }

    fn probe(&self) -> Result<(), ConvertError> {
        if tool_available(CWEBP, &["-version"]) {
            Ok(())
        } else {
            Err(ConvertError::MissingDependency {
                tool: CWEBP.to_string(),
                hint: "macOS: brew install webp; Linux: sudo apt-get install webp".to_string(),
            })
        }
    }

    fn encode(&self, input: &Path, temp_output: &Path) -> Result<(), ConvertError> {
        let mut cmd = Command::new(CWEBP);
        cmd.arg("-q")
            .arg(self.params.quality.to_string())
            .args(["-mt", "-m", "6"])
            .arg(input)
            .arg("-o")
            .arg(temp_output);
        run_tool(&mut cmd)?;
        Ok(())
    }
}
