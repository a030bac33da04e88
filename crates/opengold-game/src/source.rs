//! Per-game version broadcast and the cursors that wait on it.
//!
//! An [`EventSource`] owns a monotonically increasing version counter
//! published over a [`tokio::sync::watch`] channel. Every long-poll
//! request holds a [`Cursor`] created from the source with the version
//! the client last saw. [`Cursor::next`] suspends until the counter moves
//! past that version and then loads a fresh snapshot.
//!
//! # Waiter registration
//!
//! A waiter is registered for exactly as long as a [`Cursor::next`]
//! future is alive. The registration is an RAII guard held inside the
//! future, so dropping the future (because a deadline won a race, or the
//! request was aborted) deregisters it. There is no separate unsubscribe
//! call to forget.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::error::EngineError;

/// Loads the snapshot a cursor hands back once its version condition holds.
type Loader<T> = Box<dyn Fn() -> Result<T, EngineError> + Send + Sync>;

/// Runs once when a cursor is dropped.
type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// A shared, long-lived version counter for one game (or the game list).
///
/// Mutated only by the engine through [`EventSource::advance`]; read by
/// any number of cursors.
#[derive(Debug)]
pub struct EventSource {
    /// Human-readable name used in logs and errors.
    label: String,
    /// Broadcast of the current version.
    versions: watch::Sender<u64>,
    /// Number of cursors currently suspended in [`Cursor::next`].
    waiters: Arc<AtomicUsize>,
}

impl EventSource {
    /// Create a source at version `0`.
    pub fn new(label: impl Into<String>) -> Self {
        let (versions, _) = watch::channel(0);
        Self {
            label: label.into(),
            versions,
            waiters: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The label this source was created with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The current version.
    pub fn version(&self) -> u64 {
        *self.versions.borrow()
    }

    /// Number of waiters currently registered on this source.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Number of live cursors on this source, suspended or not.
    pub fn subscribers(&self) -> usize {
        self.versions.receiver_count()
    }

    /// Advance the version by one and wake every waiter whose cursor is
    /// now behind. Returns the new version.
    pub fn advance(&self) -> Result<u64, EngineError> {
        let mut advanced = None;
        self.versions.send_if_modified(|version| {
            let Some(next) = version.checked_add(1) else {
                return false;
            };
            *version = next;
            advanced = Some(next);
            true
        });
        advanced.ok_or_else(|| EngineError::VersionOverflow(self.label.clone()))
    }

    /// Create a cursor positioned at `since`.
    ///
    /// With `since = None` the first call to [`Cursor::next`] resolves
    /// immediately with the current snapshot.
    pub fn cursor<T, F>(&self, since: Option<u64>, load: F) -> Cursor<T>
    where
        F: Fn() -> Result<T, EngineError> + Send + Sync + 'static,
    {
        Cursor {
            label: self.label.clone(),
            since,
            versions: self.versions.subscribe(),
            waiters: Arc::clone(&self.waiters),
            load: Box::new(load),
            release: None,
        }
    }
}

/// A single waiter's view of an [`EventSource`]: the source plus the
/// version the client has already seen.
pub struct Cursor<T> {
    label: String,
    since: Option<u64>,
    versions: watch::Receiver<u64>,
    waiters: Arc<AtomicUsize>,
    load: Loader<T>,
    // Declared last: fields drop in order, so the hook runs after this
    // cursor's receiver is gone and `subscribers()` no longer counts it.
    release: Option<Release>,
}

impl<T> Cursor<T> {
    /// The last-seen version this cursor compares against.
    pub const fn since(&self) -> Option<u64> {
        self.since
    }

    /// Label of the source this cursor reads from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run `hook` once when this cursor is dropped.
    #[must_use]
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        self.release = Some(Release(Some(Box::new(hook))));
        self
    }

    /// Wait until the source's version exceeds the cursor's last-seen
    /// version, then load and return the snapshot.
    ///
    /// Cancel-safe: dropping the returned future deregisters the waiter
    /// and nothing is delivered.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SourceClosed`] if the source is dropped
    /// while waiting, or whatever the snapshot loader reports.
    pub async fn next(&mut self) -> Result<T, EngineError> {
        let _registration = Registration::new(&self.waiters);
        let since = self.since;

        let closed = self
            .versions
            .wait_for(move |version| since.is_none_or(|seen| *version > seen))
            .await
            .is_err();
        if closed {
            return Err(EngineError::SourceClosed(self.label.clone()));
        }

        (self.load)()
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("label", &self.label)
            .field("since", &self.since)
            .finish_non_exhaustive()
    }
}

/// Calls its hook when dropped.
struct Release(Option<ReleaseHook>);

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

/// Counts one suspended waiter for as long as it lives.
struct Registration(Arc<AtomicUsize>);

impl Registration {
    fn new(waiters: &Arc<AtomicUsize>) -> Self {
        waiters.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(waiters))
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
