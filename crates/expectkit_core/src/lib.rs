//! expectkit Core Library
//!
//! Ergonomic helpers over a host test framework's asynchronous expectations:
//! - Fulfillment tracking with a derived "satisfied" flag
//! - Closure-based completion helpers
//! - Default and named timeouts
//! - Numeric-to-duration conversions
//!
//! The host (anything implementing [`Host`]) owns counting, waiting and
//! failure reporting. [`LocalHost`] is an in-process host.
//!
//! # Quick Start
//!
//! ```
//! use expectkit_core::{AsyncTestCase, LocalHost, SMALL};
//! use std::thread;
//!
//! let mut case = AsyncTestCase::new(LocalHost::new());
//! let loaded = case.expect("data loaded").unwrap();
//!
//! thread::scope(|s| {
//!     s.spawn(|| loaded.fulfill());
//! });
//!
//! let outcome = case.wait_for(&loaded, SMALL).unwrap();
//! assert!(outcome.is_completed());
//! assert!(loaded.is_satisfied());
//! ```
//!
//! # Completion Callbacks
//!
//! Work that reports back through a callback can hand that callback a
//! [`Completion`]. The expectation is fulfilled after the callback body runs:
//!
//! ```
//! use expectkit_core::{AsyncTestCase, DurationExt, LocalHost};
//!
//! fn fetch(on_done: impl FnOnce(u32) -> u32) -> u32 {
//!     on_done(42)
//! }
//!
//! let mut case = AsyncTestCase::new(LocalHost::new());
//! let fetched = case.expect("fetched").unwrap();
//!
//! let value = fetched.run_with_completion(|done| {
//!     fetch(|n| done.finish_with(|| n + 1))
//! });
//!
//! assert_eq!(value, 43);
//! assert!(case.wait_for(&fetched, 10u64.milliseconds()).unwrap().is_completed());
//! ```
//!
//! # Inverted Expectations
//!
//! ```
//! use expectkit_core::{AsyncTestCase, LocalHost, WaitOutcome};
//! use std::time::Duration;
//!
//! let mut case = AsyncTestCase::new(LocalHost::new());
//! let retried = case.expect_not_to_occur("request retried").unwrap();
//!
//! let outcome = case.wait_for(&retried, Duration::from_millis(5)).unwrap();
//! assert_eq!(outcome, WaitOutcome::Completed);
//! ```

mod config;
mod duration;
mod error;
mod host;
mod test_case;
mod tracker;

pub use config::{Config, HostConfig, TimeoutConfig, CONFIG_FILE_NAME};
pub use duration::{DurationExt, DEFAULT_TIMEOUT, SMALL, TINY};
pub use error::{ExpectError, Result};
pub use host::{
    ExpectationSpec, Failure, FailureMode, Host, HostExpectation, LocalExpectation, LocalHost,
    WaitOutcome,
};
pub use test_case::AsyncTestCase;
pub use tracker::{Completion, Tracker};
