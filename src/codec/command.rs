//! External tool execution: run a command to completion, surface exit code and stderr.

use log::debug;
use std::process::{Command, Output, Stdio};

use crate::error::ConvertError;

/// Render a command line for debug logs.
pub fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Last non-empty stderr line, which is where ffmpeg and cwebp put the actual reason.
pub fn last_stderr_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}

/// Run `cmd` with stdin closed and output captured. Non-zero exit is an error carrying the
/// exit code (None when killed by a signal) and the last stderr line.
pub fn run_tool(cmd: &mut Command) -> Result<Output, ConvertError> {
    debug!("Running: {}", describe(cmd));
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        return Err(ConvertError::ToolFailed {
            code: output.status.code(),
            stderr: last_stderr_line(&output.stderr),
        });
    }
    Ok(output)
}

/// Run `cmd` and return its stderr regardless of exit status (ffmpeg prints stream info there and exits 1 without an output).
pub fn capture_stderr(cmd: &mut Command) -> Result<String, ConvertError> {
    debug!("Probing: {}", describe(cmd));
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;
    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
}

/// True when `program args...` starts and exits 0. Used for dependency and capability probes.
pub fn tool_available(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
