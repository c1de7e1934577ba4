//! Process supervision for the external search tool.
//!
//! A [`ProcessSupervisor`] owns at most one child process at a time. The
//! child's stdout and stderr are both captured and forwarded as raw chunks
//! through a single event channel, followed by exactly one
//! [`SupervisorEvent::Terminated`] once the process is gone and both streams
//! have been drained.

use std::ffi::{OsStr, OsString};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Size of the buffer used for each read from a child stream.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, absent when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// The process exited on its own with an exit code
    pub normal_exit: bool,
    /// The process was killed through [`ProcessSupervisor::cancel`]
    pub killed: bool,
}

impl ExitReport {
    fn from_status(status: ExitStatus, killed: bool) -> Self {
        let exit_code = status.code();
        Self {
            exit_code,
            normal_exit: exit_code.is_some() && !killed,
            killed,
        }
    }

    fn abnormal(killed: bool) -> Self {
        Self {
            exit_code: None,
            normal_exit: false,
            killed,
        }
    }
}

/// Events delivered by a running supervisor, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Raw bytes read from one of the child's streams
    Output { stream: OutputStream, chunk: Vec<u8> },
    /// The process ended; always the last event of a run
    Terminated(ExitReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Running,
    Finished(ExitReport),
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("a search process is already running")]
    AlreadyRunning,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0:?} pipe not available")]
    PipeNotAvailable(OutputStream),
}

/// Owner of a single external process and its event stream.
pub struct ProcessSupervisor {
    state: SupervisorState,
    events: Option<mpsc::UnboundedReceiver<SupervisorEvent>>,
    cancellation_token: Option<CancellationToken>,
    pid: Option<u32>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            state: SupervisorState::NotStarted,
            events: None,
            cancellation_token: None,
            pid: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SupervisorState::Running
    }

    /// OS process id of the current child, if one was started.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Spawn `executable` with `args`.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`SupervisorError::AlreadyRunning`] while a previous process of this
    /// supervisor has not delivered its terminal event yet.
    pub fn start(
        &mut self,
        executable: impl AsRef<OsStr>,
        args: &[OsString],
    ) -> Result<(), SupervisorError> {
        if self.is_running() {
            log::warn!("Refusing to start: previous search process still running");
            return Err(SupervisorError::AlreadyRunning);
        }

        let executable = executable.as_ref();
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: executable.to_string_lossy().into_owned(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(SupervisorError::PipeNotAvailable(OutputStream::Stdout))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(SupervisorError::PipeNotAvailable(OutputStream::Stderr))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let readers = [
            tokio::spawn(forward_output(stdout, OutputStream::Stdout, sender.clone())),
            tokio::spawn(forward_output(stderr, OutputStream::Stderr, sender.clone())),
        ];

        self.pid = child.id();
        log::info!("Search process spawned (pid: {:?})", self.pid);
        tokio::spawn(watch_child(child, token.clone(), readers, sender));

        self.events = Some(receiver);
        self.cancellation_token = Some(token);
        self.state = SupervisorState::Running;
        Ok(())
    }

    /// Request forced termination of the running process.
    ///
    /// Returns immediately; the matching `Terminated` event (with
    /// `killed == true`) arrives later through [`next_event`](Self::next_event).
    /// Returns `false` and does nothing when no process is running or a kill
    /// was already requested.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            log::debug!("Cancel ignored: no search process running");
            return false;
        }

        match &self.cancellation_token {
            Some(token) if !token.is_cancelled() => {
                log::info!("Killing search process (pid: {:?})", self.pid);
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the next event of the current run.
    ///
    /// Returns `None` when nothing was started or the terminal event of the
    /// current run has already been delivered.
    pub async fn next_event(&mut self) -> Option<SupervisorEvent> {
        let receiver = self.events.as_mut()?;
        let event = receiver.recv().await;

        match &event {
            Some(SupervisorEvent::Terminated(report)) => self.finish(*report),
            Some(SupervisorEvent::Output { .. }) => {}
            None => {
                // Watcher task vanished without reporting (runtime shutdown)
                let killed = self
                    .cancellation_token
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled);
                log::warn!("Search process event channel closed without exit report");
                self.finish(ExitReport::abnormal(killed));
            }
        }

        event
    }

    fn finish(&mut self, report: ExitReport) {
        log::debug!("Search process finished: {:?}", report);
        self.state = SupervisorState::Finished(report);
        self.events = None;
        self.cancellation_token = None;
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Some(token) = self.cancellation_token.take() {
            log::debug!("Supervisor dropped while running, killing child");
            token.cancel();
        }
    }
}

async fn forward_output<R>(
    mut reader: R,
    stream: OutputStream,
    sender: mpsc::UnboundedSender<SupervisorEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                log::trace!("{:?} chunk: {} bytes", stream, n);
                let event = SupervisorEvent::Output {
                    stream,
                    chunk: buffer[..n].to_vec(),
                };
                if sender.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Failed to read {:?} of search process: {}", stream, e);
                break;
            }
        }
    }
}

async fn watch_child(
    mut child: Child,
    token: CancellationToken,
    readers: [JoinHandle<()>; 2],
    sender: mpsc::UnboundedSender<SupervisorEvent>,
) {
    let (status, killed) = tokio::select! {
        status = child.wait() => (status, false),
        _ = token.cancelled() => {
            if let Err(e) = child.start_kill() {
                log::warn!("Failed to kill child process: {}", e);
            }
            (child.wait().await, true)
        }
    };

    // Output events must all precede the terminal event
    for reader in readers {
        if let Err(e) = reader.await {
            log::warn!("Output reader task failed: {}", e);
        }
    }

    let report = match status {
        Ok(status) => ExitReport::from_status(status, killed),
        Err(e) => {
            log::error!("Failed to wait for search process: {}", e);
            ExitReport::abnormal(killed)
        }
    };

    let _ = sender.send(SupervisorEvent::Terminated(report));
}
