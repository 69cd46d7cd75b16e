//! Readiness conditions and the polling waiter.

pub mod condition;
pub mod waiter;

pub use condition::{Condition, FnCondition, ObjectExists, PortReachable};
pub use waiter::{wait_on_condition, wait_with_defaults, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
