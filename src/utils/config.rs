//! Application configuration constants.
//! Naming, defaults and worker tuning in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    output_suffix: &'static str,
    temp_marker: &'static str,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                output_suffix: "_compressed",
                temp_marker: "tmp",
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory config file looked up in the input root (CLI only).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Suffix appended to the input root's name to build the output root.
    pub fn output_suffix(&self) -> &str {
        self.output_suffix
    }

    /// Marker inserted between the source name and the output extension of in-progress files.
    pub fn temp_marker(&self) -> &str {
        self.temp_marker
    }

    /// Run log file name for an encoder, e.g. `webp.log`.
    pub fn log_filename(&self, encoder_name: &str) -> String {
        format!("{encoder_name}.log")
    }

    /// Directories skipped by default: `@eaDir`-style NAS metadata and dot directories.
    pub fn default_skip_dir_patterns(&self) -> Vec<String> {
        vec!["@*".to_string(), ".*".to_string()]
    }

    /// Files skipped by default: dot files (AppleDouble `._x.jpg` and friends).
    pub fn default_skip_file_patterns(&self) -> Vec<String> {
        vec![".*".to_string()]
    }
}

// ---- Worker pool ----

/// Worker count limits.
/// Use [`WorkerLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available hardware threads; set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Lower bound for the default worker count.
    pub floor: usize,
    /// Workers added on top of the core count (one extra keeps the pool busy while a child process starts).
    pub oversubscribe: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_WORKERS,
            oversubscribe: Self::EXTRA_WORKERS,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_WORKERS: usize = 3;
    pub const EXTRA_WORKERS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default worker count: `max(floor, all_threads + oversubscribe)`.
    pub fn default_workers(&self) -> usize {
        (self.all_threads + self.oversubscribe).max(self.floor)
    }

    /// Resolve the worker count: explicit request wins, then the default; both capped by the encoder's own limit.
    pub fn resolve(&self, requested: Option<usize>, encoder_max: Option<usize>) -> usize {
        let n = requested.unwrap_or_else(|| self.default_workers()).max(1);
        match encoder_max {
            Some(cap) => n.min(cap.max(1)),
            None => n,
        }
    }
}

// ---- Reporting ----

/// Skip report and size formatting.
pub struct ReportConsts;

impl ReportConsts {
    /// Skipped files listed individually before collapsing into "... and N more".
    pub const SKIPPED_FILES_SHOWN: usize = 10;
    /// Units for human-readable sizes (1024-based).
    pub const SIZE_UNITS: [&'static str; 5] = ["B", "KB", "MB", "GB", "TB"];
}
