use crate::error::{DocTextError, ExtractError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative cancellation shared between the pipeline and running extractors.
///
/// Cloning is cheap; every clone observes the same state. Cancellation is
/// one-way: once set it stays set for the life of the signal.
#[derive(Clone, Debug, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    interrupt_message_shown: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("cancellation requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint for extractors: `Err(Cancelled)` once cancellation is requested.
    pub fn check(&self) -> std::result::Result<(), ExtractError> {
        if self.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }

    /// Cancels this signal on the first Ctrl+C and exits the process on the second.
    ///
    /// `ctrlc` allows a single handler per process, so this fails if another
    /// handler is already installed.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let signal = self.clone();

        ctrlc::set_handler(move || {
            if !signal.inner.interrupt_message_shown.swap(true, Ordering::SeqCst) {
                eprintln!("\nStopping after in-flight extractions finish... (press Ctrl+C again to force exit)");
                signal.cancel();
            } else {
                eprintln!("\nForce stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| DocTextError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })
    }
}
