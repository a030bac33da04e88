//! The long-poll coordinator.
//!
//! [`LongPoll::await_update`] is the only place a request suspends. It
//! races three things:
//!
//! 1. the cursor's next snapshot from the game's event source,
//! 2. the configured deadline,
//! 3. the server-wide shutdown signal.
//!
//! `tokio::select!` polls them in one task, so exactly one branch wins.
//! The losing futures are dropped before `await_update` returns; dropping
//! the cursor's pending `next()` releases its waiter registration, so no
//! waiter outlives its request.

use std::time::Duration;

use opengold_game::{Cursor, EngineError};
use tokio::sync::watch;
use tracing::debug;

/// Result of one long-poll wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The source advanced past the cursor; here is the snapshot.
    Delivered(T),
    /// Nothing new before the deadline (or the server is shutting down).
    TimedOut,
}

/// Waits on cursors with a fixed deadline.
#[derive(Debug, Clone)]
pub struct LongPoll {
    timeout: Duration,
    shutdown: ShutdownSignal,
}

impl LongPoll {
    /// Create a coordinator with the given per-request deadline.
    pub const fn new(timeout: Duration, shutdown: ShutdownSignal) -> Self {
        Self { timeout, shutdown }
    }

    /// The per-request deadline.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the cursor's next snapshot or the deadline, whichever
    /// comes first. The cursor is consumed: it lives exactly as long as
    /// this wait.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineError`] from the event source. A fault is never
    /// reported as [`PollOutcome::TimedOut`].
    pub async fn await_update<T>(
        &self,
        mut cursor: Cursor<T>,
    ) -> Result<PollOutcome<T>, EngineError> {
        let mut shutdown = self.shutdown.clone();

        let outcome = tokio::select! {
            biased;
            next = cursor.next() => next.map(PollOutcome::Delivered),
            () = tokio::time::sleep(self.timeout) => Ok(PollOutcome::TimedOut),
            () = shutdown.cancelled() => Ok(PollOutcome::TimedOut),
        };

        match &outcome {
            Ok(PollOutcome::Delivered(_)) => {
                debug!(source = cursor.label(), since = ?cursor.since(), "long-poll delivered");
            }
            Ok(PollOutcome::TimedOut) => {
                debug!(source = cursor.label(), since = ?cursor.since(), "long-poll timed out");
            }
            Err(e) => {
                debug!(source = cursor.label(), error = %e, "long-poll source fault");
            }
        }

        outcome
    }
}

/// Owner side of the server-wide shutdown signal.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create an untriggered shutdown handle.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A signal that resolves once [`Shutdown::trigger`] is called.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel every in-flight long-poll. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of the shutdown signal, cloned into every waiter.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered. Never resolves if the
    /// [`Shutdown`] owner is dropped without triggering.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
