//! Error types for expectkit_core operations.

use crate::host::WaitOutcome;
use thiserror::Error;

/// Core error type for expectkit_core operations.
///
/// Only misuse of the wrapper surfaces here. Over-fulfillment, timeouts and
/// inverted fulfillments are host failures and are reported by the host.
#[derive(Error, Debug)]
pub enum ExpectError {
    /// A tracker was constructed without a host expectation handle.
    #[error("invalid expectation handle: no host expectation was provided")]
    InvalidHandle,

    /// An expectation was requested with an expected fulfillment count of zero.
    #[error("invalid expected fulfillment count: {0} (must be at least 1)")]
    InvalidExpectedCount(usize),

    /// A wait was requested with nothing to wait on.
    #[error("no expectations to wait for")]
    NoExpectations,

    /// A wait finished without completing.
    #[error("expectations not satisfied: {0}")]
    Unsatisfied(WaitOutcome),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ExpectError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidHandle => {
                Some("Create trackers through AsyncTestCase::expect so a host handle is always attached.")
            }
            Self::InvalidExpectedCount(_) => {
                Some("Use expect_not_to_occur for an expectation that must never be fulfilled.")
            }
            Self::NoExpectations => {
                Some("Create an expectation with expect() before waiting, or check that it was not already waited on.")
            }
            Self::Unsatisfied(WaitOutcome::TimedOut { .. }) => {
                Some("Raise the timeout or check that every expectation is fulfilled on all code paths.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for expectkit_core operations.
pub type Result<T> = std::result::Result<T, ExpectError>;
