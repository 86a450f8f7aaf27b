//! Fulfillment tracking over a host expectation.

use crate::error::{ExpectError, Result};
use crate::host::HostExpectation;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Wraps a host expectation and counts the fulfillments made through it.
///
/// The tracker never waits and never reports failures. It forwards each
/// fulfillment to the host and keeps a monotonic count, from which
/// [`is_satisfied`](Tracker::is_satisfied) is derived. Once satisfied, a
/// tracker stays satisfied.
///
/// `fulfill` takes `&self`, so a tracker can be shared with worker threads
/// by reference (scoped threads) or through an `Arc`.
pub struct Tracker<H> {
    handle: H,
    expected_count: usize,
    fulfilled_count: AtomicUsize,
}

impl<H: HostExpectation> Tracker<H> {
    /// Wraps a host expectation handle.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` if `handle` is `None`.
    pub fn new(handle: Option<H>) -> Result<Self> {
        let handle = handle.ok_or(ExpectError::InvalidHandle)?;
        let expected_count = handle.expected_fulfillment_count();

        Ok(Self {
            handle,
            expected_count,
            fulfilled_count: AtomicUsize::new(0),
        })
    }

    /// Fulfills the host expectation once, then counts the fulfillment.
    pub fn fulfill(&self) {
        self.handle.fulfill();
        let fulfilled = self.fulfilled_count.fetch_add(1, Ordering::SeqCst) + 1;

        trace!(
            description = self.description(),
            fulfilled,
            expected = self.expected_count,
            "fulfilled"
        );
        if fulfilled == self.expected_count {
            debug!(description = self.description(), "expectation satisfied");
        }
    }

    /// Hands `body` a [`Completion`] to signal when its work is done.
    ///
    /// Returns whatever `body` returns. Nothing is fulfilled if `body` drops
    /// the completion without calling it.
    pub fn run_with_completion<R>(&self, body: impl FnOnce(Completion<'_, H>) -> R) -> R {
        body(Completion { tracker: self })
    }

    /// Number of fulfillments needed.
    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Number of fulfillments made through this tracker.
    pub fn fulfilled_count(&self) -> usize {
        self.fulfilled_count.load(Ordering::SeqCst)
    }

    /// Whether `fulfilled_count() >= expected_count()`.
    pub fn is_satisfied(&self) -> bool {
        self.fulfilled_count() >= self.expected_count
    }

    /// The host expectation's description.
    pub fn description(&self) -> &str {
        self.handle.description()
    }

    /// Whether the host expectation must not be fulfilled.
    pub fn is_inverted(&self) -> bool {
        self.handle.is_inverted()
    }

    /// The wrapped host expectation.
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

impl<H: HostExpectation> std::fmt::Debug for Tracker<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("description", &self.description())
            .field("expected_count", &self.expected_count)
            .field("fulfilled_count", &self.fulfilled_count())
            .finish()
    }
}

/// One-shot completion signal handed out by [`Tracker::run_with_completion`].
///
/// Consumed by either finishing call, so it fulfills at most once.
#[must_use = "dropping a Completion without finishing never fulfills the expectation"]
pub struct Completion<'a, H: HostExpectation> {
    tracker: &'a Tracker<H>,
}

impl<'a, H: HostExpectation> Completion<'a, H> {
    /// Fulfills the expectation.
    pub fn finish(self) {
        self.tracker.fulfill();
    }

    /// Runs `thunk`, then fulfills the expectation and returns the thunk's value.
    ///
    /// The fulfillment runs after `thunk` on every exit path, including
    /// unwinding. Panics are not caught.
    pub fn finish_with<T>(self, thunk: impl FnOnce() -> T) -> T {
        let _guard = FulfillOnExit(self.tracker);
        thunk()
    }
}

struct FulfillOnExit<'a, H: HostExpectation>(&'a Tracker<H>);

impl<H: HostExpectation> Drop for FulfillOnExit<'_, H> {
    fn drop(&mut self) {
        self.0.fulfill();
    }
}
