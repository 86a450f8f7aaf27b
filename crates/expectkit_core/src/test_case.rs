//! Expectation creation and waiting for a single test.

use crate::config::Config;
use crate::error::{ExpectError, Result};
use crate::host::{ExpectationSpec, Host, HostExpectation, LocalHost, WaitOutcome};
use crate::tracker::Tracker;
use std::time::Duration;
use tracing::warn;

struct Registered<E> {
    handle: E,
    waited: bool,
}

/// Creates expectations on a host and waits for them.
///
/// Every expectation created here is remembered so that
/// [`wait_for_all`](AsyncTestCase::wait_for_all) can wait on the ones not yet
/// waited for. Dropping the test case with expectations that were never
/// waited on logs a warning for each of them.
pub struct AsyncTestCase<H: Host> {
    host: H,
    config: Config,
    registered: Vec<Registered<H::Expectation>>,
}

impl AsyncTestCase<LocalHost> {
    /// Creates a test case on a [`LocalHost`] configured from `config`.
    pub fn local(config: Config) -> Self {
        let host = LocalHost::from_config(&config.host);
        Self::with_config(host, config)
    }
}

impl<H: Host> AsyncTestCase<H> {
    /// Creates a test case on `host` with the default configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, Config::default())
    }

    /// Creates a test case on `host` with `config`.
    pub fn with_config(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            registered: Vec::new(),
        }
    }

    /// The underlying host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Timeout used by [`wait_for_all`](Self::wait_for_all) when none is given.
    pub fn default_timeout(&self) -> Duration {
        self.config.timeouts.default_timeout()
    }

    /// The configured very short timeout.
    pub fn tiny_timeout(&self) -> Duration {
        self.config.timeouts.tiny()
    }

    /// The configured short timeout.
    pub fn small_timeout(&self) -> Duration {
        self.config.timeouts.small()
    }

    /// Creates an expectation that needs one fulfillment.
    pub fn expect(&mut self, description: &str) -> Result<Tracker<H::Expectation>> {
        self.expect_count(description, 1)
    }

    /// Creates an expectation that needs `expected_count` fulfillments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidExpectedCount` if `expected_count` is zero.
    pub fn expect_count(
        &mut self,
        description: &str,
        expected_count: usize,
    ) -> Result<Tracker<H::Expectation>> {
        if expected_count == 0 {
            return Err(ExpectError::InvalidExpectedCount(expected_count));
        }
        self.create(ExpectationSpec::new(description).expected_count(expected_count))
    }

    /// Creates an expectation that must not be fulfilled.
    pub fn expect_not_to_occur(&mut self, description: &str) -> Result<Tracker<H::Expectation>> {
        self.create(ExpectationSpec::new(description).inverted())
    }

    fn create(&mut self, spec: ExpectationSpec) -> Result<Tracker<H::Expectation>> {
        let spec = spec.assert_for_overfulfill(self.config.host.assert_for_overfulfill);
        let handle = self.host.create_expectation(spec);
        self.registered.push(Registered {
            handle: handle.clone(),
            waited: false,
        });
        Tracker::new(Some(handle))
    }

    /// Waits for one tracker.
    pub fn wait_for(
        &mut self,
        tracker: &Tracker<H::Expectation>,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        self.wait_for_many(&[tracker], timeout)
    }

    /// Waits for several trackers, in any order.
    ///
    /// # Errors
    ///
    /// Returns `NoExpectations` if `trackers` is empty.
    pub fn wait_for_many(
        &mut self,
        trackers: &[&Tracker<H::Expectation>],
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        self.wait_on_trackers(trackers, timeout, false)
    }

    /// Waits for several trackers, which must be satisfied in the given order.
    pub fn wait_for_in_order(
        &mut self,
        trackers: &[&Tracker<H::Expectation>],
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        self.wait_on_trackers(trackers, timeout, true)
    }

    fn wait_on_trackers(
        &mut self,
        trackers: &[&Tracker<H::Expectation>],
        timeout: Duration,
        enforce_order: bool,
    ) -> Result<WaitOutcome> {
        if trackers.is_empty() {
            return Err(ExpectError::NoExpectations);
        }

        let handles: Vec<H::Expectation> = trackers.iter().map(|t| t.handle().clone()).collect();
        for handle in &handles {
            self.mark_waited(handle);
        }

        Ok(self.host.wait(&handles, timeout, enforce_order))
    }

    /// Waits for every expectation not yet waited on.
    ///
    /// Uses [`default_timeout`](Self::default_timeout) when `timeout` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `NoExpectations` if there is nothing left to wait for.
    pub fn wait_for_all(&mut self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());

        let pending: Vec<H::Expectation> = self
            .registered
            .iter_mut()
            .filter(|r| !r.waited)
            .map(|r| {
                r.waited = true;
                r.handle.clone()
            })
            .collect();

        if pending.is_empty() {
            return Err(ExpectError::NoExpectations);
        }

        Ok(self.host.wait(&pending, timeout, false))
    }

    /// Like [`wait_for_all`](Self::wait_for_all), then passes the outcome to
    /// `on_complete` before returning it.
    pub fn wait_for_all_with(
        &mut self,
        timeout: Option<Duration>,
        on_complete: impl FnOnce(&WaitOutcome),
    ) -> Result<WaitOutcome> {
        let outcome = self.wait_for_all(timeout)?;
        on_complete(&outcome);
        Ok(outcome)
    }

    /// Number of created expectations not yet waited on.
    pub fn pending_count(&self) -> usize {
        self.registered.iter().filter(|r| !r.waited).count()
    }

    fn mark_waited(&mut self, handle: &H::Expectation) {
        if let Some(entry) = self.registered.iter_mut().find(|r| r.handle == *handle) {
            entry.waited = true;
        }
    }
}

impl<H: Host> Drop for AsyncTestCase<H> {
    fn drop(&mut self) {
        for entry in self.registered.iter().filter(|r| !r.waited) {
            warn!(
                description = entry.handle.description(),
                "expectation was never waited on"
            );
        }
    }
}
