//! User-facing transient notices.
//!
//! The host shows these as toasts. Everything in this crate that needs to
//! tell the user something goes through a [`Notifier`] so that the host
//! binding, the CLI and tests can each decide where the message ends up.

use std::sync::Mutex;
use tracing::warn;

/// Sink for user-visible messages.
pub trait Notifier {
    fn notice(&self, message: &str);
}

/// Notifier that writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notice(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Notifier that keeps every notice, for inspection after the fact.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far, oldest first.
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notice(&self, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(message.to_string());
        }
    }
}
