//! In-process host built on `Mutex` + `Condvar`.

use super::{ExpectationSpec, Failure, FailureMode, Host, HostExpectation, WaitOutcome};
use crate::config::HostConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// State shared by a host and every expectation it created.
struct Shared {
    mode: FailureMode,
    failures: Mutex<Vec<Failure>>,
    /// Bumped on every fulfillment; waiters sleep on `signal` against it.
    generation: Mutex<u64>,
    signal: Condvar,
    /// Host-wide counter stamped on expectations as they become satisfied.
    sequence: AtomicU64,
}

impl Shared {
    fn report(&self, failure: Failure) {
        warn!(%failure, "expectation failure");
        lock(&self.failures).push(failure.clone());

        if self.mode == FailureMode::Panic && !thread::panicking() {
            panic!("{}", failure);
        }
    }

    fn notify(&self) {
        let mut generation = lock(&self.generation);
        *generation = generation.wrapping_add(1);
        self.signal.notify_all();
    }
}

/// Host that keeps expectations, waits and failures in this process.
///
/// Cloning yields another handle to the same host.
#[derive(Clone)]
pub struct LocalHost {
    shared: Arc<Shared>,
}

impl LocalHost {
    /// Creates a host that records failures without panicking.
    pub fn new() -> Self {
        Self::with_failure_mode(FailureMode::Record)
    }

    /// Creates a host with the given failure mode.
    pub fn with_failure_mode(mode: FailureMode) -> Self {
        Self {
            shared: Arc::new(Shared {
                mode,
                failures: Mutex::new(Vec::new()),
                generation: Mutex::new(0),
                signal: Condvar::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a host from the `[host]` configuration section.
    pub fn from_config(config: &HostConfig) -> Self {
        Self::with_failure_mode(config.failure_mode)
    }

    /// Returns the configured failure mode.
    pub fn failure_mode(&self) -> FailureMode {
        self.shared.mode
    }

    /// Returns every failure reported so far, oldest first.
    pub fn failures(&self) -> Vec<Failure> {
        lock(&self.shared.failures).clone()
    }

    /// Panics with the list of recorded failures, if there are any.
    pub fn assert_no_failures(&self) {
        let failures = self.failures();
        if !failures.is_empty() {
            let lines: Vec<String> = failures.iter().map(|f| format!("  - {}", f)).collect();
            panic!(
                "{} expectation failure(s) recorded:\n{}",
                failures.len(),
                lines.join("\n")
            );
        }
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for LocalHost {
    type Expectation = LocalExpectation;

    fn create_expectation(&self, spec: ExpectationSpec) -> LocalExpectation {
        debug!(
            description = %spec.description,
            expected_count = spec.expected_count,
            inverted = spec.inverted,
            "created expectation"
        );

        LocalExpectation {
            inner: Arc::new(ExpectationInner {
                spec,
                state: Mutex::new(FulfillState::default()),
                shared: Arc::clone(&self.shared),
            }),
        }
    }

    fn wait(
        &self,
        expectations: &[LocalExpectation],
        timeout: Duration,
        enforce_order: bool,
    ) -> WaitOutcome {
        debug!(
            count = expectations.len(),
            ?timeout,
            enforce_order,
            "waiting for expectations"
        );

        // None when the deadline overflows `Instant`: wait without a limit,
        // which never ends for an unfulfilled inverted expectation.
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = lock(&self.shared.generation);

        let outcome = loop {
            let unfulfilled = match evaluate(expectations, enforce_order) {
                Progress::Finished(outcome) => break outcome,
                Progress::Pending { unfulfilled } => unfulfilled,
            };

            guard = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break if unfulfilled.is_empty() {
                            WaitOutcome::Completed
                        } else {
                            WaitOutcome::TimedOut { unfulfilled }
                        };
                    }
                    self.shared
                        .signal
                        .wait_timeout(guard, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .shared
                    .signal
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        };
        drop(guard);

        debug!(%outcome, "wait finished");
        if !outcome.is_completed() {
            self.shared.report(Failure::Wait {
                timeout,
                outcome: outcome.clone(),
            });
        }
        outcome
    }
}

#[derive(Debug, Default)]
struct FulfillState {
    count: usize,
    satisfied_at: Option<u64>,
}

struct ExpectationInner {
    spec: ExpectationSpec,
    state: Mutex<FulfillState>,
    shared: Arc<Shared>,
}

/// Expectation handle created by a [`LocalHost`].
///
/// Cloning yields another handle to the same expectation.
#[derive(Clone)]
pub struct LocalExpectation {
    inner: Arc<ExpectationInner>,
}

impl LocalExpectation {
    /// Fulfillments the host has seen for this expectation.
    pub fn fulfillment_count(&self) -> usize {
        lock(&self.inner.state).count
    }

    /// Whether the host considers this expectation satisfied.
    pub fn is_satisfied(&self) -> bool {
        lock(&self.inner.state).satisfied_at.is_some()
    }

    fn satisfied_at(&self) -> Option<u64> {
        lock(&self.inner.state).satisfied_at
    }
}

impl HostExpectation for LocalExpectation {
    fn description(&self) -> &str {
        &self.inner.spec.description
    }

    fn expected_fulfillment_count(&self) -> usize {
        self.inner.spec.expected_count
    }

    fn is_inverted(&self) -> bool {
        self.inner.spec.inverted
    }

    fn fulfill(&self) {
        let spec = &self.inner.spec;
        let shared = &self.inner.shared;

        let count = {
            let mut state = lock(&self.inner.state);
            state.count += 1;
            if state.count == spec.expected_count {
                state.satisfied_at = Some(shared.sequence.fetch_add(1, Ordering::SeqCst));
            }
            state.count
        };
        shared.notify();

        if count > spec.expected_count && !spec.inverted && spec.assert_for_overfulfill {
            shared.report(Failure::Overfulfilled {
                description: spec.description.clone(),
                expected: spec.expected_count,
                actual: count,
            });
        }
    }
}

impl PartialEq for LocalExpectation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for LocalExpectation {}

impl std::fmt::Debug for LocalExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalExpectation")
            .field("spec", &self.inner.spec)
            .field("count", &self.fulfillment_count())
            .finish()
    }
}

enum Progress {
    Finished(WaitOutcome),
    Pending { unfulfilled: Vec<String> },
}

/// Checks `expectations` against the current fulfillment state.
///
/// `Pending` means the wait must go on: either regular expectations are
/// unsatisfied (listed in `unfulfilled`) or inverted ones must be watched
/// until the deadline.
fn evaluate(expectations: &[LocalExpectation], enforce_order: bool) -> Progress {
    let mut has_inverted = false;
    let mut unfulfilled = Vec::new();
    let mut previous: Option<(u64, &str)> = None;

    for expectation in expectations {
        let description = expectation.description();

        if expectation.is_inverted() {
            has_inverted = true;
            if expectation.fulfillment_count() >= expectation.expected_fulfillment_count() {
                return Progress::Finished(WaitOutcome::InvertedFulfillment {
                    description: description.to_string(),
                });
            }
            continue;
        }

        let Some(seq) = expectation.satisfied_at() else {
            unfulfilled.push(description.to_string());
            continue;
        };

        if enforce_order {
            if let Some(pending) = unfulfilled.first() {
                return Progress::Finished(WaitOutcome::IncorrectOrder {
                    expected: pending.clone(),
                    actual: description.to_string(),
                });
            }
            if let Some((prev_seq, prev_description)) = previous {
                if seq < prev_seq {
                    return Progress::Finished(WaitOutcome::IncorrectOrder {
                        expected: prev_description.to_string(),
                        actual: description.to_string(),
                    });
                }
            }
            previous = Some((seq, description));
        }
    }

    if unfulfilled.is_empty() && !has_inverted {
        Progress::Finished(WaitOutcome::Completed)
    } else {
        Progress::Pending { unfulfilled }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
