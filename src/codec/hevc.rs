//! Video → HEVC through ffmpeg, preferring a hardware encoder when one works.

use anyhow::{Context, bail};
use log::{debug, info};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use super::command::{capture_stderr, run_tool, tool_available};
use super::{EncodePlan, Encoder};
use crate::error::ConvertError;

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".webm", ".flv", ".m4v"];
/// ffmpeg builds tried in order.
const FFMPEG_CANDIDATES: &[&str] = &["ffmpeg7", "ffmpeg"];
const DEFAULT_BITRATE: &str = "1M";
const SOFTWARE_AUDIO: &[&str] = &["-c:a", "aac", "-b:a", "128k"];
/// Fixed quality for VideoToolbox when no bitrate is requested.
const VIDEOTOOLBOX_QUALITY: &str = "70";

/// A hardware HEVC encoder and the flag it takes for constant quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HwEncoder {
    pub codec: &'static str,
    pub quality_flag: &'static str,
}

/// Probe order; the first one listed by `ffmpeg -encoders` that passes a test encode wins.
const HW_ENCODERS: &[HwEncoder] = &[
    HwEncoder { codec: "hevc_qsv", quality_flag: "-global_quality" },
    HwEncoder { codec: "hevc_vaapi", quality_flag: "-qp" },
    HwEncoder { codec: "hevc_videotoolbox", quality_flag: "-q" },
    HwEncoder { codec: "hevc_nvenc", quality_flag: "-cq" },
    HwEncoder { codec: "hevc_amf", quality_flag: "-qp" },
];

/// ffmpeg settings for HEVC output.
#[derive(Clone, Debug, Default)]
pub struct HevcParams {
    /// Target video bitrate, e.g. `1M` or `500k`. Mutually exclusive with `crf`.
    pub bitrate: Option<String>,
    /// Constant rate factor (0-51).
    pub crf: Option<u8>,
    /// ffmpeg preset (ultrafast ... veryslow).
    pub preset: Option<String>,
    /// Force libx265 even when a hardware encoder is available.
    pub software: bool,
}

/// Resolved at probe time, shared by every task.
#[derive(Clone, Debug)]
struct Toolchain {
    ffmpeg: String,
    hw: Option<HwEncoder>,
}

pub struct HevcEncoder {
    params: HevcParams,
    target_bps: Option<u64>,
    toolchain: OnceLock<Toolchain>,
}

/// Parse `1M`, `500k` or a plain number into bits per second (1024-based suffixes).
pub fn parse_bitrate(s: &str) -> anyhow::Result<u64> {
    let lower = s.trim().to_lowercase();
    let (digits, factor) = if let Some(d) = lower.strip_suffix('k') {
        (d, 1024)
    } else if let Some(d) = lower.strip_suffix('m') {
        (d, 1024 * 1024)
    } else {
        (lower.as_str(), 1)
    };
    let n: u64 = digits
        .parse()
        .with_context(|| format!("invalid bitrate '{s}' (expected e.g. 1M, 500k)"))?;
    n.checked_mul(factor)
        .with_context(|| format!("bitrate '{s}' is out of range"))
}

/// Bitrate of the first video stream in ffmpeg's `-i` banner, in bits per second.
pub fn parse_video_bitrate(ffmpeg_stderr: &str) -> Option<u64> {
    ffmpeg_stderr
        .lines()
        .filter(|l| l.contains("Stream #") && l.contains("Video:"))
        .find_map(|line| {
            line.split(',').map(str::trim).find_map(|part| {
                let kbps = part.strip_suffix("kb/s")?.trim();
                let kbps: f64 = kbps.parse().ok()?;
                Some((kbps * 1000.0) as u64)
            })
        })
}

/// First hardware encoder from `HW_ENCODERS` that appears in `ffmpeg -encoders` output and
/// passes `test_encode`. None means software (libx265).
pub fn pick_hw_encoder(
    encoders_listing: &str,
    test_encode: impl Fn(&HwEncoder) -> bool,
) -> Option<HwEncoder> {
    HW_ENCODERS
        .iter()
        .copied()
        .filter(|hw| encoders_listing.contains(hw.codec))
        .find(|hw| {
            let works = test_encode(hw);
            if !works {
                debug!("{} is listed but failed a test encode", hw.codec);
            }
            works
        })
}

impl HevcEncoder {
    pub fn new(params: HevcParams) -> anyhow::Result<Self> {
        if params.bitrate.is_some() && params.crf.is_some() {
            bail!("--bitrate and --crf are mutually exclusive");
        }
        if let Some(crf) = params.crf
            && crf > 51
        {
            bail!("CRF must be between 0 and 51");
        }
        let target_bps = params.bitrate.as_deref().map(parse_bitrate).transpose()?;
        Ok(Self {
            params,
            target_bps,
            toolchain: OnceLock::new(),
        })
    }

    pub fn params(&self) -> &HevcParams {
        &self.params
    }

    fn ffmpeg(&self) -> &str {
        self.toolchain
            .get()
            .map(|t| t.ffmpeg.as_str())
            .unwrap_or(FFMPEG_CANDIDATES[FFMPEG_CANDIDATES.len() - 1])
    }

    fn hw(&self) -> Option<HwEncoder> {
        self.toolchain.get().and_then(|t| t.hw)
    }

    fn detect_hw_encoder(ffmpeg: &str) -> Option<HwEncoder> {
        let listing = Command::new(ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .output()
            .ok()
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())?;
        // `-encoders` lists what was compiled in, not what the machine can run.
        let test_encode = |hw: &HwEncoder| {
            tool_available(
                ffmpeg,
                &[
                    "-hide_banner", "-f", "lavfi", "-i", "testsrc", "-frames:v", "1", "-c:v",
                    hw.codec, "-f", "null", "-",
                ],
            )
        };
        pick_hw_encoder(&listing, test_encode)
    }

    fn source_bitrate(&self, input: &Path) -> Option<u64> {
        let mut cmd = Command::new(self.ffmpeg());
        cmd.arg("-hide_banner").arg("-i").arg(input);
        match capture_stderr(&mut cmd) {
            Ok(banner) => parse_video_bitrate(&banner),
            Err(e) => {
                debug!("Could not read bitrate of {}: {}", input.display(), e);
                None
            }
        }
    }

    /// ffmpeg arguments between `-i <input>` and the output path.
    pub fn encode_args(&self, hw: Option<HwEncoder>) -> Vec<String> {
        let p = &self.params;
        let mut args: Vec<String> = Vec::new();
        match hw {
            Some(hw) => {
                args.extend(["-c:v", hw.codec, "-tag:v", "hvc1"].map(String::from));
                if let Some(ref preset) = p.preset {
                    args.extend(["-preset".to_string(), preset.clone()]);
                }
                if hw.codec == "hevc_videotoolbox" {
                    match p.bitrate {
                        Some(ref b) => args.extend(["-b:v".to_string(), b.clone()]),
                        None => args.extend(["-q:v", VIDEOTOOLBOX_QUALITY].map(String::from)),
                    }
                    return args;
                }
                if let (Some(crf), None) = (p.crf, &p.bitrate) {
                    args.extend([hw.quality_flag.to_string(), crf.to_string()]);
                    return args;
                }
            }
            None => {
                args.extend(["-c:v", "libx265", "-tag:v", "hvc1"].map(String::from));
                if let Some(ref preset) = p.preset {
                    args.extend(["-preset".to_string(), preset.clone()]);
                }
                args.extend(SOFTWARE_AUDIO.iter().map(|s| s.to_string()));
            }
        }
        match (&p.bitrate, p.crf) {
            (Some(b), _) => args.extend(["-b:v".to_string(), b.clone()]),
            (None, Some(crf)) => args.extend(["-crf".to_string(), crf.to_string()]),
            (None, None) => args.extend(["-b:v", DEFAULT_BITRATE].map(String::from)),
        }
        args
    }
}

impl Encoder for HevcEncoder {
    fn name(&self) -> &str {
        "hevc"
    }

    fn extensions(&self) -> &[&str] {
        VIDEO_EXTENSIONS
    }

    fn output_extension(&self, input: &Path) -> String {
        input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string()
    }

    fn probe(&self) -> Result<(), ConvertError> {
        let ffmpeg = FFMPEG_CANDIDATES
            .iter()
            .find(|c| tool_available(c, &["-version"]))
            .ok_or_else(|| ConvertError::MissingDependency {
                tool: "ffmpeg".to_string(),
                hint: "macOS: brew install ffmpeg; Linux: sudo apt-get install ffmpeg".to_string(),
            })?;
        let hw = if self.params.software {
            None
        } else {
            Self::detect_hw_encoder(ffmpeg)
        };
        match hw {
            Some(hw) => info!("Using {} with hardware encoder {}", ffmpeg, hw.codec),
            None => info!("Using {} with software encoder libx265", ffmpeg),
        }
        let _ = self.toolchain.set(Toolchain {
            ffmpeg: ffmpeg.to_string(),
            hw,
        });
        Ok(())
    }

    fn plan(&self, input: &Path) -> EncodePlan {
        let Some(target) = self.target_bps else {
            return EncodePlan::Encode;
        };
        match self.source_bitrate(input) {
            Some(source) if source <= target => EncodePlan::Copy {
                reason: format!("source bitrate {source} bps <= target {target} bps"),
            },
            _ => EncodePlan::Encode,
        }
    }

    fn encode(&self, input: &Path, temp_output: &Path) -> Result<(), ConvertError> {
        let mut cmd = Command::new(self.ffmpeg());
        cmd.args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .args(self.encode_args(self.hw()))
            .arg(temp_output);
        run_tool(&mut cmd)?;
        Ok(())
    }
}
