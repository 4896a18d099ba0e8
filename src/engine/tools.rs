//! Path and filter utilities

use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::utils::config::ReportConsts;
use crate::{Opts, SkipRecord};

/// A name-matching skip rule: `prefix*`, `*suffix`, or an exact name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl SkipPattern {
    /// Parse one pattern. A `*` is only allowed at one end; empty and lone `*` are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw == "*" {
            bail!("invalid skip pattern '{raw}': would match nothing or everything");
        }
        let pattern = if let Some(head) = raw.strip_suffix('*') {
            SkipPattern::Prefix(head.to_string())
        } else if let Some(tail) = raw.strip_prefix('*') {
            SkipPattern::Suffix(tail.to_string())
        } else {
            SkipPattern::Exact(raw.to_string())
        };
        let body = match &pattern {
            SkipPattern::Exact(s) | SkipPattern::Prefix(s) | SkipPattern::Suffix(s) => s,
        };
        if body.contains('*') {
            bail!("invalid skip pattern '{raw}': '*' is only supported at the start or end");
        }
        Ok(pattern)
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            SkipPattern::Exact(s) => name == s,
            SkipPattern::Prefix(s) => name.starts_with(s.as_str()),
            SkipPattern::Suffix(s) => name.ends_with(s.as_str()),
        }
    }
}

impl fmt::Display for SkipPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipPattern::Exact(s) => write!(f, "{s}"),
            SkipPattern::Prefix(s) => write!(f, "{s}*"),
            SkipPattern::Suffix(s) => write!(f, "*{s}"),
        }
    }
}

/// Parse a pattern list, failing on the first malformed entry.
pub fn parse_patterns(raw: &[String]) -> Result<Vec<SkipPattern>> {
    raw.iter()
        .map(|p| SkipPattern::parse(p))
        .collect::<Result<Vec<_>>>()
        .context("skip patterns")
}

/// True if the final component of `path` matches any pattern (first match wins).
/// A match is appended to `skipped` unless that path is already recorded.
pub fn should_skip(path: &Path, patterns: &[SkipPattern], skipped: &mut Vec<SkipRecord>) -> bool {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy(),
        None => return false,
    };
    let Some(pattern) = patterns.iter().find(|p| p.matches(&name)) else {
        return false;
    };
    if !skipped.iter().any(|r| r.path == path) {
        skipped.push(SkipRecord {
            path: path.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    true
}

/// Directory and file skip rules plus the paths they excluded during this run.
#[derive(Debug)]
pub struct PathFilter {
    dir_patterns: Vec<SkipPattern>,
    file_patterns: Vec<SkipPattern>,
    skipped_dirs: Mutex<Vec<SkipRecord>>,
    skipped_files: Mutex<Vec<SkipRecord>>,
}

impl PathFilter {
    pub fn new(dir_patterns: Vec<SkipPattern>, file_patterns: Vec<SkipPattern>) -> Self {
        Self {
            dir_patterns,
            file_patterns,
            skipped_dirs: Mutex::new(Vec::new()),
            skipped_files: Mutex::new(Vec::new()),
        }
    }

    /// Build from raw option strings; malformed patterns are a configuration error.
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        Ok(Self::new(
            parse_patterns(&opts.skip_dir_patterns)?,
            parse_patterns(&opts.skip_file_patterns)?,
        ))
    }

    pub fn should_skip_dir(&self, path: &Path) -> bool {
        let mut skipped = self.skipped_dirs.lock().unwrap_or_else(|e| e.into_inner());
        should_skip(path, &self.dir_patterns, &mut skipped)
    }

    pub fn should_skip_file(&self, path: &Path) -> bool {
        let mut skipped = self.skipped_files.lock().unwrap_or_else(|e| e.into_inner());
        should_skip(path, &self.file_patterns, &mut skipped)
    }

    pub fn dir_patterns(&self) -> &[SkipPattern] {
        &self.dir_patterns
    }

    pub fn file_patterns(&self) -> &[SkipPattern] {
        &self.file_patterns
    }

    pub fn skipped_dirs(&self) -> Vec<SkipRecord> {
        self.skipped_dirs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn skipped_files(&self) -> Vec<SkipRecord> {
        self.skipped_files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Human-readable size, 1024-based with two decimals (`1.50 MB`). Negative values keep their sign.
pub fn format_size(bytes: i64) -> String {
    let units = ReportConsts::SIZE_UNITS;
    let mut size = bytes.unsigned_abs() as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < units.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let sign = if bytes < 0 { "-" } else { "" };
    format!("{sign}{size:.2} {}", units[unit])
}

/// Canonicalize the input root and make sure it is a directory.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Directory not found - {}", path.display()))?;
    if !path.is_dir() {
        bail!("Not a directory - {}", path.display());
    }
    Ok(path)
}

/// Sibling output root: `<parent>/<input name><suffix>`.
pub fn output_root_for(input_root: &Path, suffix: &str) -> Result<PathBuf> {
    let name = input_root
        .file_name()
        .with_context(|| format!("input root {} has no name", input_root.display()))?;
    let mut out_name = name.to_os_string();
    out_name.push(suffix);
    Ok(input_root.with_file_name(out_name))
}
