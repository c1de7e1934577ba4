//! `rg --version` probe with a bounded wait.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Oldest ripgrep major version recommended for use.
pub const RECOMMENDED_MAJOR_VERSION: u32 = 13;

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("ripgrep executable not found: {}", .0.display())]
    ToolNotFound(PathBuf),
    #[error("failed to start ripgrep: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("ripgrep did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to read ripgrep output: {0}")]
    Output(#[source] std::io::Error),
    #[error("ripgrep printed no version information")]
    Empty,
}

/// Run `<tool> --version` and return its trimmed stdout, or stderr when
/// stdout is empty.
pub async fn probe_version(executable: &Path) -> Result<String, VersionError> {
    if !executable.is_file() {
        return Err(VersionError::ToolNotFound(executable.to_path_buf()));
    }

    let child = Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(VersionError::Spawn)?;

    let output = timeout(PROBE_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| VersionError::Timeout(PROBE_TIMEOUT))?
        .map_err(VersionError::Output)?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let version = if stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    } else {
        stdout
    };

    if version.is_empty() {
        return Err(VersionError::Empty);
    }
    log::info!("ripgrep version: {}", version.lines().next().unwrap_or_default());
    Ok(version)
}

/// Extract the major version from output such as `ripgrep 14.1.0 (rev ...)`.
pub fn parse_major_version(version: &str) -> Option<u32> {
    let pattern = Regex::new(r"(\d+)\.\d+").ok()?;
    pattern.captures(version)?.get(1)?.as_str().parse().ok()
}

pub fn meets_recommended_version(version: &str) -> bool {
    parse_major_version(version).is_some_and(|major| major >= RECOMMENDED_MAJOR_VERSION)
}
