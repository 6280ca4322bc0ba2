//! Cancellation flag shared between the CLI signal handler and the sequencer.

use std::sync::Arc;
use tokio::sync::watch;

/// A one-shot, cloneable interrupt flag.
///
/// Once triggered it stays triggered. Every clone observes the same flag.
#[derive(Debug, Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    /// A fresh, untriggered flag.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Raise the flag.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the flag is raised.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns once triggered
        let _ = rx.wait_for(|triggered| *triggered).await;
    }

    /// Raise the flag when the process receives Ctrl-C.
    pub fn trigger_on_ctrl_c(&self) {
        let interrupt = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, halting startup");
                interrupt.trigger();
            }
        });
    }
}
