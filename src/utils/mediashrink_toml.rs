//! Load `.mediashrink.toml` from the input directory (CLI only). Lib callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Opts, ProgressMode};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MediashrinkToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    pub(crate) webp: WebpSection,
    #[serde(default)]
    pub(crate) hevc: HevcSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    local_progress: Option<bool>,
    skip_dirs: Option<Vec<String>>,
    skip_files: Option<Vec<String>>,
    output_suffix: Option<String>,
    follow_links: Option<bool>,
    strict: Option<bool>,
    verbose: Option<bool>,
    log_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebpSection {
    pub(crate) quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HevcSection {
    pub(crate) bitrate: Option<String>,
    pub(crate) crf: Option<u8>,
    pub(crate) preset: Option<String>,
    pub(crate) software: Option<bool>,
}

/// Load `.mediashrink.toml` from `dir` if present. Returns None if file missing or unreadable.
pub(crate) fn load_mediashrink_toml(dir: &Path) -> Option<MediashrinkToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $opts_field:ident) => {
        if let Some(v) = $idx.$idx_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &MediashrinkToml, opts: &mut Opts) {
    let s = &file.settings;
    if let Some(n) = s.workers {
        opts.workers = Some(n);
    }
    if let Some(local) = s.local_progress {
        opts.progress = if local {
            ProgressMode::PerDirectory
        } else {
            ProgressMode::Global
        };
    }
    apply_file_opt!(s, opts, skip_dirs => skip_dir_patterns);
    apply_file_opt!(s, opts, skip_files => skip_file_patterns);
    apply_file_opt!(s, opts, output_suffix => output_suffix);
    apply_file_opt!(s, opts, follow_links => follow_links);
    apply_file_opt!(s, opts, strict => strict);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(ref p) = s.log_file {
        opts.log_file = Some(PathBuf::from(p));
    }
}
