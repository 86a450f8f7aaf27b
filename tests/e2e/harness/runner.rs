use super::assertions::{Assertion, OutcomeMatch};
use super::init_tracing;
use super::steps::ScenarioStep;
use anyhow::{anyhow, bail, Context, Result};
use expectkit_core::{
    AsyncTestCase, Config, Failure, LocalExpectation, LocalHost, Tracker, WaitOutcome,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type SharedTracker = Arc<Tracker<LocalExpectation>>;

/// What a completion thunk observed while it ran.
#[derive(Debug, Clone)]
struct ThunkRecord {
    name: String,
    /// Host fulfillment count seen from inside the thunk.
    host_count_during: usize,
    /// Host fulfillment count seen right after the completion returned.
    host_count_after: usize,
}

/// Executes scenarios against a real LocalHost
pub struct ScenarioRunner {
    case: AsyncTestCase<LocalHost>,
    trackers: HashMap<String, SharedTracker>,
    workers: Vec<JoinHandle<()>>,
    thunks: Arc<Mutex<Vec<ThunkRecord>>>,
    last_outcome: Option<WaitOutcome>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        init_tracing();

        Ok(Self {
            case: AsyncTestCase::local(config),
            trackers: HashMap::new(),
            workers: Vec::new(),
            thunks: Arc::new(Mutex::new(Vec::new())),
            last_outcome: None,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence, then join outstanding workers
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        self.join_workers()
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Expect { name, count } => self.handle_expect(name, *count),
            ScenarioStep::ExpectNotToOccur { name } => self.handle_expect_not_to_occur(name),

            ScenarioStep::Fulfill { name } => self.handle_fulfill(name),
            ScenarioStep::FulfillLater { name, delay } => self.handle_fulfill_later(name, *delay),
            ScenarioStep::CompleteLater { name, delay } => {
                self.handle_complete_later(name, *delay)
            }

            ScenarioStep::WaitFor { names, timeout } => self.handle_wait(names, *timeout, false),
            ScenarioStep::WaitInOrder { names, timeout } => {
                self.handle_wait(names, *timeout, true)
            }
            ScenarioStep::WaitForAll { timeout } => self.handle_wait_for_all(*timeout),

            ScenarioStep::Sleep { duration } => {
                thread::sleep(*duration);
                Ok(())
            }
            ScenarioStep::JoinWorkers => self.join_workers(),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Expectation creation =====

    fn handle_expect(&mut self, name: &str, count: usize) -> Result<()> {
        let tracker = self.case.expect_count(name, count)?;
        self.register(name, tracker)
    }

    fn handle_expect_not_to_occur(&mut self, name: &str) -> Result<()> {
        let tracker = self.case.expect_not_to_occur(name)?;
        self.register(name, tracker)
    }

    fn register(&mut self, name: &str, tracker: Tracker<LocalExpectation>) -> Result<()> {
        if self.trackers.contains_key(name) {
            bail!("Expectation '{}' already exists in this scenario", name);
        }
        self.trackers.insert(name.to_string(), Arc::new(tracker));
        Ok(())
    }

    fn tracker(&self, name: &str) -> Result<SharedTracker> {
        self.trackers
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown expectation '{}'", name))
    }

    // ===== Fulfillment =====

    fn handle_fulfill(&mut self, name: &str) -> Result<()> {
        self.tracker(name)?.fulfill();
        Ok(())
    }

    fn handle_fulfill_later(&mut self, name: &str, delay: Duration) -> Result<()> {
        let tracker = self.tracker(name)?;
        self.workers.push(thread::spawn(move || {
            thread::sleep(delay);
            tracker.fulfill();
        }));
        Ok(())
    }

    fn handle_complete_later(&mut self, name: &str, delay: Duration) -> Result<()> {
        let tracker = self.tracker(name)?;
        let thunks = Arc::clone(&self.thunks);
        let name = name.to_string();

        self.workers.push(thread::spawn(move || {
            let host_count_during = tracker.run_with_completion(|done| {
                thread::sleep(delay);
                done.finish_with(|| tracker.handle().fulfillment_count())
            });
            let host_count_after = tracker.handle().fulfillment_count();

            if let Ok(mut records) = thunks.lock() {
                records.push(ThunkRecord {
                    name,
                    host_count_during,
                    host_count_after,
                });
            }
        }));
        Ok(())
    }

    fn join_workers(&mut self) -> Result<()> {
        for worker in self.workers.drain(..) {
            worker
                .join()
                .map_err(|_| anyhow!("Worker thread panicked"))?;
        }
        Ok(())
    }

    // ===== Waiting =====

    fn handle_wait(&mut self, names: &[String], timeout: Duration, ordered: bool) -> Result<()> {
        let held = names
            .iter()
            .map(|name| self.tracker(name))
            .collect::<Result<Vec<_>>>()?;
        let trackers: Vec<&Tracker<LocalExpectation>> = held.iter().map(|t| &**t).collect();

        let outcome = if ordered {
            self.case.wait_for_in_order(&trackers, timeout)?
        } else {
            self.case.wait_for_many(&trackers, timeout)?
        };
        self.last_outcome = Some(outcome);
        Ok(())
    }

    fn handle_wait_for_all(&mut self, timeout: Option<Duration>) -> Result<()> {
        let mut handled = None;
        let outcome = self
            .case
            .wait_for_all_with(timeout, |outcome| handled = Some(outcome.clone()))?;

        if handled.as_ref() != Some(&outcome) {
            bail!("Completion handler saw {:?}, wait returned {:?}", handled, outcome);
        }
        self.last_outcome = Some(outcome);
        Ok(())
    }

    // ===== Assertions =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::FulfilledCount { name, count } => self.assert_fulfilled_count(name, *count),
            Assertion::Satisfied(name) => self.assert_satisfied(name, true),
            Assertion::NotSatisfied(name) => self.assert_satisfied(name, false),
            Assertion::LastOutcome(expected) => self.assert_last_outcome(expected),
            Assertion::PendingCount(n) => {
                let pending = self.case.pending_count();
                if pending != *n {
                    bail!("Expected {} pending expectations, found {}", n, pending);
                }
                Ok(())
            }
            Assertion::NoFailures => self.assert_failure_count(0),
            Assertion::FailureCount(n) => self.assert_failure_count(*n),
            Assertion::OverfulfillReported(name) => self.assert_overfulfill_reported(name),
            Assertion::ThunkRanBeforeFulfill(name) => self.assert_thunk_ran_before_fulfill(name),
            Assertion::Custom(f) => f(self.case.host()),
        }
    }

    fn assert_fulfilled_count(&self, name: &str, expected: usize) -> Result<()> {
        let actual = self.tracker(name)?.fulfilled_count();
        if actual != expected {
            bail!(
                "Expected '{}' to have {} fulfillments, found {}",
                name,
                expected,
                actual
            );
        }
        Ok(())
    }

    fn assert_satisfied(&self, name: &str, expected: bool) -> Result<()> {
        let tracker = self.tracker(name)?;
        if tracker.is_satisfied() != expected {
            bail!(
                "Expected '{}' satisfied = {}, but it has {}/{} fulfillments",
                name,
                expected,
                tracker.fulfilled_count(),
                tracker.expected_count()
            );
        }
        Ok(())
    }

    fn assert_last_outcome(&self, expected: &OutcomeMatch) -> Result<()> {
        let outcome = self
            .last_outcome
            .as_ref()
            .ok_or_else(|| anyhow!("No wait has finished yet"))?;

        if !expected.matches(outcome) {
            bail!("Expected outcome {:?}, got {:?}", expected, outcome);
        }
        Ok(())
    }

    fn assert_failure_count(&self, expected: usize) -> Result<()> {
        let failures = self.case.host().failures();
        if failures.len() != expected {
            bail!(
                "Expected {} host failures, found {}: {:?}",
                expected,
                failures.len(),
                failures
            );
        }
        Ok(())
    }

    fn assert_overfulfill_reported(&self, name: &str) -> Result<()> {
        let reported = self.case.host().failures().iter().any(|f| {
            matches!(f, Failure::Overfulfilled { description, .. } if description == name)
        });
        if !reported {
            bail!("No over-fulfillment reported for '{}'", name);
        }
        Ok(())
    }

    fn assert_thunk_ran_before_fulfill(&self, name: &str) -> Result<()> {
        let records = self
            .thunks
            .lock()
            .map_err(|_| anyhow!("Thunk log poisoned"))?;
        let record = records
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow!("No completion thunk has run for '{}'", name))?;

        if record.host_count_after != record.host_count_during + 1 {
            bail!(
                "Expected exactly one fulfillment after the thunk for '{}': {:?}",
                name,
                record
            );
        }
        Ok(())
    }
}
