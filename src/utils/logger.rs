use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::Builder;
use log::Level;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Run log file shared by every log call. Opened once per run, append-only.
static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();

/// Level tag colors used in console output.
pub struct Colors;

impl Colors {
    pub fn level(level: Level) -> colored::ColoredString {
        match level {
            Level::Error => "ERROR".red(),
            Level::Warn => "WARN".yellow(),
            Level::Info => "INFO".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".normal(),
        }
    }
}

/// Open (create or append) the run log file. Its directory must already exist.
/// Later calls keep the first file.
fn open_log_file(path: &Path) -> Result<()> {
    if LOG_FILE.get().is_some() {
        return Ok(());
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let _ = LOG_FILE.set(Mutex::new(file));
    Ok(())
}

fn append_to_log_file(line: &str) {
    if let Some(file) = LOG_FILE.get() {
        let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(file, "{line}");
        let _ = file.flush();
    }
}

/// Console logging (colored) plus an optional plain-text run log file.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use log::LevelFilter;

    if let Some(path) = log_file {
        open_log_file(path)?;
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            append_to_log_file(&format!(
                "{} [{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            ));
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let path = record.target().to_string().white();
                    format!(
                        "[{} {} {}] {}",
                        name.cyan(),
                        Colors::level(record.level()),
                        path,
                        record.args()
                    )
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init()
        .context("initialize logger")?;
    Ok(())
}
