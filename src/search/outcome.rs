//! Mapping from process exit to search outcome.

use crate::core::ExitReport;
use crate::types::MatchMode;

/// ripgrep's exit code for "ran fine, nothing matched".
pub const NO_MATCHES_EXIT_CODE: i32 = 1;

/// Success exit code of the search tool.
pub const SUCCESS_EXIT_CODE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    RunningStillActive,
    CompletedNoMatches,
    CompletedWithMatches,
    CompletedToolError(i32),
    Crashed,
    KilledByUser,
}

impl ProcessOutcome {
    /// Classify how a search process ended.
    ///
    /// Exit code 0 counts as "with matches" when at least one entry was
    /// emitted, or unconditionally in list-only mode.
    pub fn from_exit(report: &ExitReport, entries_emitted: usize, mode: MatchMode) -> Self {
        if report.killed {
            return ProcessOutcome::KilledByUser;
        }
        if !report.normal_exit {
            return ProcessOutcome::Crashed;
        }

        match report.exit_code {
            Some(SUCCESS_EXIT_CODE) => {
                if entries_emitted > 0 || mode == MatchMode::ListOnly {
                    ProcessOutcome::CompletedWithMatches
                } else {
                    ProcessOutcome::CompletedNoMatches
                }
            }
            Some(NO_MATCHES_EXIT_CODE) => ProcessOutcome::CompletedNoMatches,
            Some(code) => ProcessOutcome::CompletedToolError(code),
            None => ProcessOutcome::Crashed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessOutcome::RunningStillActive)
    }

    /// User-facing status line for this outcome.
    pub fn status_message(&self, result_count: usize) -> String {
        match self {
            ProcessOutcome::RunningStillActive => "Searching, please wait...".to_string(),
            ProcessOutcome::CompletedWithMatches => format!("{} results found", result_count),
            ProcessOutcome::CompletedNoMatches => "No matches found".to_string(),
            ProcessOutcome::CompletedToolError(code) => {
                format!("Search failed, ripgrep exit code: {}", code)
            }
            ProcessOutcome::Crashed => "ripgrep process crashed".to_string(),
            ProcessOutcome::KilledByUser => {
                format!("Search stopped, {} results kept", result_count)
            }
        }
    }
}
