//! Export job: run ripgrep to completion with its raw output written to a file.
//!
//! The job blocks the calling thread until the process exits (no timeout),
//! so callers on an async runtime should go through [`ExportJob::spawn`].

use crate::search::arguments::{build_arguments, render_command_line};
use crate::search::outcome::SUCCESS_EXIT_CODE;
use crate::types::SearchQuery;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("ripgrep executable not found: {}", .0.display())]
    ToolNotFound(PathBuf),
    #[error("search directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("failed to create export file {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn ripgrep: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to wait for ripgrep: {0}")]
    Wait(#[source] std::io::Error),
    #[error("export task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The facts collected for a failed export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFailure {
    pub exit_code: Option<i32>,
    pub normal_exit: bool,
    pub file_exists: bool,
    pub file_size: u64,
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exit code: {:?}, normal exit: {}, file exists: {}, size: {}",
            self.exit_code, self.normal_exit, self.file_exists, self.file_size
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Success,
    Failure(ExportFailure),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success)
    }
}

/// Result of a finished export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub exit_code: Option<i32>,
    pub normal_exit: bool,
    pub file_exists: bool,
    pub file_size: u64,
    /// Side-channel copy of everything the tool wrote to stderr
    pub stderr: String,
}

impl ExportReport {
    /// Success requires a normal exit, exit code 0 and a non-empty file.
    pub fn outcome(&self) -> ExportOutcome {
        let success = self.normal_exit
            && self.exit_code == Some(SUCCESS_EXIT_CODE)
            && self.file_exists
            && self.file_size > 0;

        if success {
            ExportOutcome::Success
        } else {
            ExportOutcome::Failure(ExportFailure {
                exit_code: self.exit_code,
                normal_exit: self.normal_exit,
                file_exists: self.file_exists,
                file_size: self.file_size,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    executable: PathBuf,
    query: SearchQuery,
    destination: PathBuf,
}

impl ExportJob {
    pub fn new(
        executable: impl Into<PathBuf>,
        query: SearchQuery,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            query,
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn arguments(&self) -> Vec<OsString> {
        build_arguments(&self.query)
    }

    /// Run the job on tokio's blocking pool.
    pub async fn spawn(self) -> Result<ExportReport, ExportError> {
        tokio::task::spawn_blocking(move || self.run()).await?
    }

    /// Run ripgrep and wait for it, writing stdout and stderr into the
    /// destination file (truncated first).
    pub fn run(&self) -> Result<ExportReport, ExportError> {
        if !self.executable.is_file() {
            return Err(ExportError::ToolNotFound(self.executable.clone()));
        }
        if !self.query.root_directory.is_dir() {
            return Err(ExportError::DirectoryNotFound(self.query.root_directory.clone()));
        }

        let args = self.arguments();
        log::info!(
            "Exporting: {} > {}",
            render_command_line(self.executable.as_os_str(), &args),
            self.destination.display()
        );

        let create_error = |source| ExportError::CreateOutput {
            path: self.destination.clone(),
            source,
        };
        let mut output = File::create(&self.destination).map_err(create_error)?;
        // Shares the file offset with `output`, so both streams append in order
        let stdout_handle = output.try_clone().map_err(create_error)?;

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_handle))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExportError::Spawn)?;

        let mut captured = Vec::new();
        if let Some(mut stderr) = child.stderr.take() {
            let mut buffer = [0u8; 8192];
            loop {
                match stderr.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        captured.extend_from_slice(&buffer[..n]);
                        if let Err(e) = output.write_all(&buffer[..n]) {
                            log::warn!("Failed to write stderr into export file: {}", e);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::warn!("Failed to read ripgrep stderr: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(ExportError::Wait)?;
        drop(output);

        let stderr = String::from_utf8_lossy(&captured).trim().to_string();
        if !stderr.is_empty() {
            log::warn!("Export stderr: {}", stderr);
        }

        let metadata = fs::metadata(&self.destination);
        let report = ExportReport {
            exit_code: status.code(),
            normal_exit: status.code().is_some(),
            file_exists: metadata.is_ok(),
            file_size: metadata.map(|m| m.len()).unwrap_or(0),
            stderr,
        };

        match report.outcome() {
            ExportOutcome::Success => {
                log::info!("Export completed: {}", self.destination.display())
            }
            ExportOutcome::Failure(failure) => log::warn!(
                "Export failed for {}: {}",
                self.destination.display(),
                failure
            ),
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report(exit_code: Option<i32>, normal_exit: bool, file_exists: bool, file_size: u64) -> ExportReport {
        ExportReport {
            exit_code,
            normal_exit,
            file_exists,
            file_size,
            stderr: String::new(),
        }
    }

    #[test]
    fn test_success_requires_all_criteria() {
        assert!(report(Some(0), true, true, 57).outcome().is_success());

        assert!(!report(Some(2), true, true, 100).outcome().is_success());
        assert!(!report(Some(0), true, false, 0).outcome().is_success());
        assert!(!report(Some(0), true, true, 0).outcome().is_success());
        assert!(!report(None, false, true, 57).outcome().is_success());
        assert!(!report(Some(0), false, true, 57).outcome().is_success());
    }

    #[test]
    fn test_failure_carries_facts() {
        let outcome = report(Some(2), true, true, 100).outcome();
        assert_eq!(
            outcome,
            ExportOutcome::Failure(ExportFailure {
                exit_code: Some(2),
                normal_exit: true,
                file_exists: true,
                file_size: 100,
            })
        );
        if let ExportOutcome::Failure(failure) = outcome {
            assert_eq!(
                failure.to_string(),
                "exit code: Some(2), normal exit: true, file exists: true, size: 100"
            );
        }
    }

    #[test]
    fn test_missing_tool_is_start_error() {
        let dir = TempDir::new().unwrap();
        let query = SearchQuery::new(dir.path(), "", false, vec![]);
        let job = ExportJob::new(dir.path().join("rg"), query, dir.path().join("out.txt"));

        assert!(matches!(job.run(), Err(ExportError::ToolNotFound(_))));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_missing_directory_is_start_error() {
        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("rg");
        fs::write(&tool, b"").unwrap();
        let query = SearchQuery::new(dir.path().join("missing"), "", false, vec![]);
        let job = ExportJob::new(&tool, query, dir.path().join("out.txt"));

        assert!(matches!(job.run(), Err(ExportError::DirectoryNotFound(_))));
    }
}
