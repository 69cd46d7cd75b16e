//! Sweep-polling condition waiter.
//!
//! Conditions are checked in a fixed left-to-right sweep rather than in
//! parallel: the failure report then reads as "these conditions, in this
//! order, never became true", and a fragile endpoint only ever sees one
//! polling loop during container startup.

use crate::condition::condition::Condition;
use crate::config::types::{Result, RigError};
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wait with the default timeout and poll interval.
pub fn wait_with_defaults(conditions: &[&dyn Condition]) -> Result<()> {
    wait_on_condition(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, conditions)
}

/// Block until every condition is satisfied or `timeout` elapses.
///
/// The worklist is seeded in the given order; each sweep pops satisfied
/// conditions off the head and stops at the first unsatisfied one, then
/// sleeps `interval` before retrying. Elapsed time is wall-clock, the
/// interval is not adaptive, and an interval of zero busy-polls. On
/// timeout the error enumerates every still-unsatisfied condition,
/// preserving their order.
pub fn wait_on_condition(
    timeout: Duration,
    interval: Duration,
    conditions: &[&dyn Condition],
) -> Result<()> {
    let mut worklist: VecDeque<&dyn Condition> = conditions.iter().copied().collect();

    let mut satisfied = worklist.is_empty();
    let started = Instant::now();

    while !satisfied && started.elapsed() <= timeout {
        while let Some(head) = worklist.front() {
            log::debug!("Checking condition [{}]", head);
            if head.satisfied() {
                worklist.pop_front();
            } else {
                break;
            }
        }

        if worklist.is_empty() {
            satisfied = true;
        } else {
            thread::sleep(interval);
        }
    }

    if satisfied {
        Ok(())
    } else {
        Err(RigError::ConditionTimeout {
            unsatisfied: worklist.iter().map(|c| c.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::condition::FnCondition;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_empty_condition_list_succeeds_immediately() {
        let started = Instant::now();
        wait_on_condition(Duration::from_secs(5), Duration::from_secs(1), &[]).unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_all_satisfied_succeeds_without_sleeping() {
        let a = FnCondition::new("a", || true);
        let b = FnCondition::new("b", || true);

        let started = Instant::now();
        wait_on_condition(Duration::from_secs(5), Duration::from_secs(5), &[&a, &b]).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_timeout_reports_unsatisfied_in_order() {
        let never = FnCondition::new("never", || false);
        let always = FnCondition::new("always", || true);

        let started = Instant::now();
        let err = wait_on_condition(
            Duration::from_millis(300),
            Duration::from_millis(100),
            &[&never, &always],
        )
        .unwrap_err();

        // Roughly the timeout, give or take one interval.
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(started.elapsed() < Duration::from_millis(800));

        // The head blocked the sweep, so both are still pending and the
        // report preserves their order.
        match err {
            RigError::ConditionTimeout { unsatisfied } => {
                assert_eq!(unsatisfied, vec!["Condition[never]", "Condition[always]"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_satisfied_head_is_popped_before_timeout_report() {
        let always = FnCondition::new("always", || true);
        let never = FnCondition::new("never", || false);

        let err = wait_on_condition(
            Duration::from_millis(200),
            Duration::from_millis(50),
            &[&always, &never],
        )
        .unwrap_err();

        match err {
            RigError::ConditionTimeout { unsatisfied } => {
                assert_eq!(unsatisfied, vec!["Condition[never]"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_condition_becoming_true_releases_wait() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_probe = Arc::clone(&calls);
        let eventually = FnCondition::new("eventually", move || {
            calls_probe.fetch_add(1, Ordering::SeqCst) >= 2
        });

        wait_on_condition(
            Duration::from_secs(5),
            Duration::from_millis(20),
            &[&eventually],
        )
        .unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }
}
