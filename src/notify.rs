//! Transient user notifications ("toasts").
//!
//! Components push notifications into an unbounded channel; whoever renders
//! the view drains the receiving end.

use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Sending half of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Level::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Level::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Level::Error, message.into());
    }

    fn send(&self, level: Level, message: String) {
        if self.tx.send(Notification { level, message }).is_err() {
            // Nobody is rendering anymore
            debug!("Notification dropped, receiver closed");
        }
    }
}
