use crate::harness::{OutcomeMatch, Scenario};
use expectkit_core::{DurationExt, SMALL, TINY};

#[test]
fn test_single_fulfillment() {
    Scenario::new("single_fulfillment")
        .expect("t")
        .assert_not_satisfied("t")
        .fulfill("t")
        .assert_satisfied("t")
        .assert_fulfilled_count("t", 1)
        .wait_for("t", TINY)
        .assert_outcome(OutcomeMatch::Completed)
        .assert_no_failures()
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_satisfied_on_third_fulfillment() {
    Scenario::new("satisfied_on_third")
        .expect_count("t", 3)
        .fulfill_times("t", 2)
        .assert_not_satisfied("t")
        .assert_fulfilled_count("t", 2)
        .fulfill("t")
        .assert_satisfied("t")
        .assert_fulfilled_count("t", 3)
        .wait_for("t", TINY)
        .assert_outcome(OutcomeMatch::Completed)
        .run()
        .unwrap();
}

#[test]
fn test_fulfilled_from_worker() {
    Scenario::new("fulfilled_from_worker")
        .expect("loaded")
        .fulfill_after("loaded", 20u64.milliseconds())
        .wait_for("loaded", SMALL * 4)
        .assert_outcome(OutcomeMatch::Completed)
        .assert_satisfied("loaded")
        .assert_no_failures()
        .run()
        .unwrap();
}

#[test]
fn test_many_workers_one_expectation() {
    Scenario::new("many_workers")
        .expect_count("chunks", 4)
        .fulfill_after("chunks", 5u64.milliseconds())
        .fulfill_after("chunks", 10u64.milliseconds())
        .fulfill_after("chunks", 15u64.milliseconds())
        .fulfill_after("chunks", 20u64.milliseconds())
        .wait_for("chunks", 2u64.seconds())
        .assert_outcome(OutcomeMatch::Completed)
        .join_workers()
        .assert_fulfilled_count("chunks", 4)
        .run()
        .unwrap();
}

#[test]
fn test_timeout_reported_by_host() {
    Scenario::new("timeout")
        .expect_count("t", 2)
        .fulfill("t")
        .wait_for("t", 10u64.milliseconds())
        .assert_outcome(OutcomeMatch::TimedOut)
        .assert_not_satisfied("t")
        .assert_failure_count(1)
        .run()
        .unwrap();
}

#[test]
fn test_overfulfill_reported_by_host() {
    Scenario::new("overfulfill")
        .expect("once")
        .fulfill_times("once", 2)
        .assert_satisfied("once")
        .assert_fulfilled_count("once", 2)
        .assert(crate::harness::Assertion::OverfulfillReported("once".into()))
        .wait_for("once", TINY)
        .assert_outcome(OutcomeMatch::Completed)
        .run()
        .unwrap();
}

#[test]
fn test_overfulfill_allowed_when_disabled() {
    Scenario::new("overfulfill_allowed")
        .assert_for_overfulfill(false)
        .expect("lenient")
        .fulfill_times("lenient", 3)
        .assert_fulfilled_count("lenient", 3)
        .wait_for("lenient", TINY)
        .assert_no_failures()
        .run()
        .unwrap();
}

#[test]
fn test_unknown_expectation_fails_scenario() {
    Scenario::new("unknown_expectation")
        .fulfill("missing")
        .run()
        .expect_failure_containing("Unknown expectation 'missing'");
}

#[test]
fn test_zero_count_rejected() {
    Scenario::new("zero_count")
        .expect_count("t", 0)
        .run()
        .expect_failure_containing("invalid expected fulfillment count");
}
