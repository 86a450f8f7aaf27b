//! Host expectation capability.
//!
//! The host owns real expectation objects: counting fulfillments, blocking
//! waits with a timeout, and pass/fail reporting. Trackers and test cases
//! only call into it through these traits, so any host (including a fake)
//! can sit underneath them.

mod local;

pub use local::{LocalExpectation, LocalHost};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single expectation object owned by the host.
pub trait HostExpectation: Send + Sync {
    /// Human-readable description given at creation.
    fn description(&self) -> &str;

    /// Number of fulfillments needed to satisfy the expectation.
    fn expected_fulfillment_count(&self) -> usize;

    /// Whether the expectation must stay unfulfilled.
    fn is_inverted(&self) -> bool;

    /// Signals one fulfillment.
    ///
    /// Over-fulfillment is the host's to report; this never returns an error.
    fn fulfill(&self);
}

/// The host test framework: creates expectations and waits on them.
pub trait Host {
    /// Expectation handle type. Clones refer to the same expectation.
    ///
    /// Equality is identity: two handles are equal only when they refer to
    /// the same expectation, whatever their descriptions.
    type Expectation: HostExpectation + Clone + PartialEq;

    /// Creates a new expectation configured by `spec`.
    fn create_expectation(&self, spec: ExpectationSpec) -> Self::Expectation;

    /// Blocks until `expectations` are satisfied, one of them fails, or
    /// `timeout` elapses.
    ///
    /// With `enforce_order`, regular expectations must be satisfied in the
    /// order they are listed.
    ///
    /// A `timeout` too large to be added to `Instant::now()` (such as
    /// `Duration::MAX`) means no deadline. Such a wait ends only when the
    /// expectations resolve; with an inverted expectation present, that is
    /// only when the inverted one is fulfilled, so it may block forever.
    fn wait(
        &self,
        expectations: &[Self::Expectation],
        timeout: Duration,
        enforce_order: bool,
    ) -> WaitOutcome;
}

/// Configuration for a new host expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationSpec {
    /// Description used in logs and failure messages.
    pub description: String,
    /// Fulfillments needed before the expectation is satisfied (>= 1).
    pub expected_count: usize,
    /// Whether the expectation must not be fulfilled.
    pub inverted: bool,
    /// Whether fulfilling past `expected_count` is reported as a failure.
    pub assert_for_overfulfill: bool,
}

impl ExpectationSpec {
    /// A regular expectation needing a single fulfillment.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_count: 1,
            inverted: false,
            assert_for_overfulfill: true,
        }
    }

    /// Sets the expected fulfillment count.
    pub fn expected_count(mut self, count: usize) -> Self {
        self.expected_count = count;
        self
    }

    /// Marks the expectation as one that must not occur.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Enables or disables over-fulfillment reporting.
    pub fn assert_for_overfulfill(mut self, enabled: bool) -> Self {
        self.assert_for_overfulfill = enabled;
        self
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every regular expectation was satisfied and no inverted one was fulfilled.
    Completed,

    /// The timeout elapsed with regular expectations still unsatisfied.
    TimedOut {
        /// Descriptions of the unsatisfied expectations, in listed order.
        unfulfilled: Vec<String>,
    },

    /// An inverted expectation was fulfilled.
    InvertedFulfillment {
        /// Description of the inverted expectation.
        description: String,
    },

    /// Expectations were satisfied out of the listed order.
    IncorrectOrder {
        /// The expectation that should have been satisfied first.
        expected: String,
        /// The expectation that was satisfied ahead of it.
        actual: String,
    },
}

impl WaitOutcome {
    /// Returns true for [`WaitOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Converts a non-completed outcome into an error, for use with `?`.
    pub fn into_result(self) -> crate::Result<()> {
        match self {
            Self::Completed => Ok(()),
            other => Err(crate::ExpectError::Unsatisfied(other)),
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::TimedOut { unfulfilled } => {
                write!(f, "timed out waiting for {}", unfulfilled.join(", "))
            }
            Self::InvertedFulfillment { description } => {
                write!(f, "inverted expectation fulfilled: {}", description)
            }
            Self::IncorrectOrder { expected, actual } => {
                write!(f, "{} was fulfilled before {}", actual, expected)
            }
        }
    }
}

/// A failure signalled by the host against the running test.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// An expectation was fulfilled more times than it expects.
    #[error("over-fulfilled expectation '{description}': {actual} fulfillments, expected {expected}")]
    Overfulfilled {
        /// Expectation description.
        description: String,
        /// Configured expected count.
        expected: usize,
        /// Fulfillments seen so far.
        actual: usize,
    },

    /// A wait did not complete.
    #[error("wait of {timeout:?} failed: {outcome}")]
    Wait {
        /// The timeout the wait was given.
        timeout: Duration,
        /// How the wait ended.
        outcome: WaitOutcome,
    },
}

/// How the local host signals a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Keep the failure in the host's failure log.
    #[default]
    Record,
    /// Record the failure, then panic with its message.
    Panic,
}
