//! Search session: ties the supervisor, the line parser and the result set
//! together for one ripgrep executable.

use crate::core::{MessageSender, ProcessSupervisor, SupervisorError, SupervisorEvent};
use crate::search::arguments::{build_arguments, render_command_line};
use crate::search::outcome::ProcessOutcome;
use crate::search::parser::{LineParser, ParseEvent};
use crate::search::results::ResultSet;
use crate::types::{MatchMode, ResultEntry, SearchQuery};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Notifications published to an observer while a search runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchNotification {
    ClearResults,
    PushResults {
        entries: Vec<ResultEntry>,
        total: usize,
    },
    ReportMissingPath(String),
    CompleteSearch {
        outcome: ProcessOutcome,
        total: usize,
    },
}

/// Progress returned by [`SearchSession::next_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// One output chunk was processed
    Batch { added: usize, total: usize },
    /// The process ended
    Finished(ProcessOutcome),
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("ripgrep executable not found: {}", .0.display())]
    ToolNotFound(PathBuf),
    #[error("search directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

pub struct SearchSession {
    executable: PathBuf,
    supervisor: ProcessSupervisor,
    parser: LineParser,
    results: ResultSet,
    mode: MatchMode,
    entries_emitted: usize,
    missing_paths: usize,
    outcome: Option<ProcessOutcome>,
    notifier: Option<MessageSender<SearchNotification>>,
}

impl SearchSession {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            supervisor: ProcessSupervisor::new(),
            parser: LineParser::new(),
            results: ResultSet::new(),
            mode: MatchMode::ListOnly,
            entries_emitted: 0,
            missing_paths: 0,
            outcome: None,
            notifier: None,
        }
    }

    /// Publish notifications to `notifier` while searching.
    pub fn with_notifier(mut self, notifier: MessageSender<SearchNotification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Outcome of the current or last search, `None` before the first one.
    pub fn outcome(&self) -> Option<ProcessOutcome> {
        self.outcome
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Lines that named a path which no longer exists.
    pub fn missing_paths(&self) -> usize {
        self.missing_paths
    }

    pub fn status_message(&self) -> String {
        match self.outcome {
            Some(outcome) => outcome.status_message(self.results.count()),
            None => format!("{} results found", self.results.count()),
        }
    }

    /// Validate preconditions, spawn ripgrep and clear previous results.
    ///
    /// A failed start, including a spawn error, leaves the previous results,
    /// outcome and observers untouched.
    pub fn start(&mut self, query: &SearchQuery) -> Result<(), SearchError> {
        if !self.executable.is_file() {
            log::warn!("ripgrep executable not found: {}", self.executable.display());
            return Err(SearchError::ToolNotFound(self.executable.clone()));
        }
        if !query.root_directory.is_dir() {
            log::warn!("Search directory not found: {}", query.root_directory.display());
            return Err(SearchError::DirectoryNotFound(query.root_directory.clone()));
        }
        if self.supervisor.is_running() {
            return Err(SupervisorError::AlreadyRunning.into());
        }

        let args = build_arguments(query);
        log::info!(
            "Starting search: {}",
            render_command_line(self.executable.as_os_str(), &args)
        );

        // Events are only consumed through `next_update`, so nothing is
        // lost by resetting after the spawn.
        self.supervisor.start(&self.executable, &args)?;

        self.results.reset();
        self.parser = LineParser::new();
        self.mode = query.match_mode;
        self.entries_emitted = 0;
        self.missing_paths = 0;
        self.notify("clearResults", SearchNotification::ClearResults);
        self.outcome = Some(ProcessOutcome::RunningStillActive);
        Ok(())
    }

    /// Ask the running search to stop. Results collected so far are kept.
    pub fn cancel(&mut self) -> bool {
        let requested = self.supervisor.cancel();
        if requested {
            log::info!("Search stop requested by user");
        }
        requested
    }

    /// Process the next supervisor event.
    ///
    /// Returns `None` when no search is running.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        match self.supervisor.next_event().await? {
            SupervisorEvent::Output { stream, chunk } => {
                let mut batch = Vec::new();
                for event in self.parser.feed(stream, &chunk) {
                    match event {
                        ParseEvent::Entry(entry) => batch.push(entry),
                        ParseEvent::MissingPath(line) => {
                            self.missing_paths += 1;
                            self.notify(
                                "reportMissingPath",
                                SearchNotification::ReportMissingPath(line),
                            );
                        }
                    }
                }

                let added = batch.len();
                self.entries_emitted += added;
                self.results.append(batch.clone());
                let total = self.results.count();
                if added > 0 {
                    self.notify(
                        "pushResults",
                        SearchNotification::PushResults {
                            entries: batch,
                            total,
                        },
                    );
                }
                Some(SessionUpdate::Batch { added, total })
            }
            SupervisorEvent::Terminated(report) => {
                self.parser.finish();
                let outcome = ProcessOutcome::from_exit(&report, self.entries_emitted, self.mode);
                self.log_outcome(outcome, report.exit_code);
                self.outcome = Some(outcome);

                let total = self.results.count();
                self.notify(
                    "completeSearch",
                    SearchNotification::CompleteSearch { outcome, total },
                );
                Some(SessionUpdate::Finished(outcome))
            }
        }
    }

    /// Drive the current search to its end.
    pub async fn wait(&mut self) -> Option<ProcessOutcome> {
        while let Some(update) = self.next_update().await {
            if let SessionUpdate::Finished(outcome) = update {
                return Some(outcome);
            }
        }
        None
    }

    /// Drive the current search to its end, cancelling it once `stop`
    /// resolves. Partial results are kept.
    ///
    /// `stop` is polled across all updates, so a stop request arriving
    /// while a batch is being processed is not lost.
    pub async fn wait_or_cancel<F>(&mut self, stop: F) -> Option<ProcessOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut stop_requested = false;

        loop {
            tokio::select! {
                update = self.next_update() => match update? {
                    SessionUpdate::Batch { added, total } => {
                        if added > 0 {
                            log::info!("{} results found", total);
                        }
                    }
                    SessionUpdate::Finished(outcome) => return Some(outcome),
                },
                _ = &mut stop, if !stop_requested => {
                    stop_requested = true;
                    self.cancel();
                }
            }
        }
    }

    fn log_outcome(&self, outcome: ProcessOutcome, exit_code: Option<i32>) {
        let total = self.results.count();
        match outcome {
            ProcessOutcome::CompletedWithMatches => {
                log::info!("Search completed: {} results", total)
            }
            ProcessOutcome::CompletedNoMatches => log::info!("Search completed: no matches"),
            ProcessOutcome::CompletedToolError(code) => {
                log::warn!("Search failed, ripgrep exit code: {}", code)
            }
            ProcessOutcome::Crashed => {
                log::error!("Search process crashed (exit code: {:?})", exit_code)
            }
            ProcessOutcome::KilledByUser => {
                log::info!("Search process killed by user, {} results kept", total)
            }
            ProcessOutcome::RunningStillActive => {}
        }
        if self.parser.noise_dropped() > 0 {
            log::debug!("Dropped {} access-denied lines", self.parser.noise_dropped());
        }
    }

    fn notify(&self, method: &str, notification: SearchNotification) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.send_message(method, notification) {
                log::debug!("Search observer gone: {}", e);
            }
        }
    }
}
