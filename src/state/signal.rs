//! "A proxied request finished" notification.
//!
//! Broadcast semantics: every waiter registered before a request completes
//! is released by that completion. Registering captures the current
//! generation, which is the "clear" step; waiting resolves once the
//! generation moves past it. Because registration and clearing are the same
//! atomic read, a completion that lands between them cannot be lost, and
//! one waiter never consumes another waiter's wakeup.

use std::time::Duration;

use tokio::sync::watch;

/// Generation counter bumped after each proxied request.
#[derive(Debug)]
pub struct RequestProcessedSignal {
    tx: watch::Sender<u64>,
}

impl RequestProcessedSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Register interest in the next completion.
    pub fn waiter(&self) -> Waiter {
        Waiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Mark one request as processed, releasing every registered waiter.
    pub fn set(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Number of completions so far.
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for RequestProcessedSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered waiter.
#[derive(Debug)]
pub struct Waiter {
    rx: watch::Receiver<u64>,
}

impl Waiter {
    /// Wait for the next completion. Returns `false` if `timeout` elapsed
    /// first.
    pub async fn wait(mut self, timeout: Option<Duration>) -> bool {
        let changed = self.rx.changed();
        match timeout {
            Some(limit) => matches!(tokio::time::timeout(limit, changed).await, Ok(Ok(()))),
            None => changed.await.is_ok(),
        }
    }
}
