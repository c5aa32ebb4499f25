//! Shutdown coordination for the gateway.
//!
//! The trigger is latched: a task that starts waiting after shutdown was
//! requested returns immediately.

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Handle a long-running task waits on.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!(waiters = self.tx.receiver_count(), "Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested.
    pub async fn recv(mut self) {
        // The sender lives in `Shutdown`; if every coordinator is gone, stop as well.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_all_waiters() {
        let shutdown = Shutdown::new();
        let a = shutdown.signal();
        let b = shutdown.clone().signal();

        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), async {
            a.recv().await;
            b.recv().await;
        })
        .await
        .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_late_waiter_sees_earlier_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), shutdown.signal().recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_untriggered_signal_stays_pending() {
        let shutdown = Shutdown::new();
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown.signal().recv()).await;
        assert!(waited.is_err());
    }
}
