//! Message envelope used to publish search notifications to observers.

use tokio::sync::mpsc;

/// A notification with a method name and a typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<T> {
    /// The method name for this message
    pub method: String,
    /// The message payload
    pub payload: T,
}

impl<T> Message<T> {
    /// Create a new Message with the specified method and payload.
    pub fn new(method: impl Into<String>, payload: T) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }
}

/// Error returned when the observer side of a channel is gone.
#[derive(Debug, thiserror::Error)]
pub enum MessageSendError {
    #[error("message channel is closed")]
    ChannelClosed,
}

/// Sending half handed to components that publish notifications.
pub struct MessageSender<T> {
    sender: mpsc::UnboundedSender<Message<T>>,
}

impl<T> MessageSender<T> {
    pub fn new(sender: mpsc::UnboundedSender<Message<T>>) -> Self {
        Self { sender }
    }

    /// Send a message to the observer.
    pub fn send_message(&self, method: impl Into<String>, payload: T) -> Result<(), MessageSendError> {
        self.sender
            .send(Message::new(method, payload))
            .map_err(|_| MessageSendError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<T> Clone for MessageSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
