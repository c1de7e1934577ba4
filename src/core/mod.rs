//! Core plumbing: the process supervisor and the notification envelope.

pub mod command;
pub mod message;

// Re-exports for convenience
pub use command::{ExitReport, OutputStream, ProcessSupervisor, SupervisorError, SupervisorEvent, SupervisorState};
pub use message::{Message, MessageSendError, MessageSender};
