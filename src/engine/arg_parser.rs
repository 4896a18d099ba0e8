use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Batch-convert a directory tree into a sibling `<dir>_compressed` tree.
#[derive(Clone, Parser)]
#[command(name = "mediashrink")]
#[command(about = "Convert images to WebP or videos to HEVC, mirroring the directory tree.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Convert images (jpg, png, heic) to WebP with cwebp.
    Webp {
        #[command(flatten)]
        common: CommonArgs,

        /// WebP quality, 0-100. Default: 85.
        #[arg(long, short = 'q', value_parser = clap::value_parser!(u8).range(0..=100))]
        quality: Option<u8>,
    },
    /// Re-encode videos to HEVC with ffmpeg.
    Hevc {
        #[command(flatten)]
        common: CommonArgs,

        /// Target video bitrate (e.g. 1M, 500k). Sources already at or below it are copied.
        #[arg(long, short = 'b', conflicts_with = "crf")]
        bitrate: Option<String>,

        /// Constant rate factor, 0-51 (lower is better quality).
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
        crf: Option<u8>,

        /// ffmpeg preset (ultrafast, fast, medium, slow, ...).
        #[arg(long, short = 'p')]
        preset: Option<String>,

        /// Use libx265 even when a hardware encoder is available.
        #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
        software: Option<bool>,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Webp { common, .. } | Commands::Hevc { common, .. } => common,
        }
    }
}

/// Flags shared by every subcommand.
#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Directory to convert. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Report progress per directory instead of over the whole tree.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub local_progress: Option<bool>,

    /// Number of parallel workers. Default: max(3, cores + 1).
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Directory skip patterns (`name`, `prefix*`, `*suffix`). Replaces the defaults (@*, .*).
    #[arg(long, num_args = 1..)]
    pub skip_dir: Vec<String>,

    /// File skip patterns, same syntax. Replaces the default (.*).
    #[arg(long, num_args = 1..)]
    pub skip_file: Vec<String>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Strict mode: fail on first permission error instead of skipping.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Follow symbolic links. Default: true.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Run log file. Default: `<encoder>.log` in DIR.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
