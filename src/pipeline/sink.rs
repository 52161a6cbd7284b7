//! Receivers for per-file and per-directory failure notifications.

use crate::error::{ErrorKind, ExtractError};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Notified once for every failure, before it becomes a result or aborts a run.
///
/// Implementations are fire-and-forget and must not panic.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, path: &Path, cause: &ExtractError, message: &str);
}

impl<F> ErrorSink for F
where
    F: Fn(&Path, &ExtractError, &str) + Send + Sync,
{
    fn on_error(&self, path: &Path, cause: &ExtractError, message: &str) {
        self(path, cause, message)
    }
}

/// Logs each failure as a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn on_error(&self, path: &Path, cause: &ExtractError, message: &str) {
        tracing::warn!(
            path = %path.display(),
            kind = %cause.kind(),
            detail = message,
            "extraction failure"
        );
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullErrorSink;

impl ErrorSink for NullErrorSink {
    fn on_error(&self, _path: &Path, _cause: &ExtractError, _message: &str) {}
}

/// Owned snapshot of a failure notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub cause: String,
    pub message: String,
}

/// Forwards failures to an unbounded channel for an event consumer.
#[derive(Debug, Clone)]
pub struct ChannelErrorSink {
    tx: mpsc::UnboundedSender<ErrorEvent>,
}

impl ChannelErrorSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ErrorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorSink for ChannelErrorSink {
    fn on_error(&self, path: &Path, cause: &ExtractError, message: &str) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.tx.send(ErrorEvent {
            path: path.to_path_buf(),
            kind: cause.kind(),
            cause: cause.to_string(),
            message: message.to_string(),
        });
    }
}
