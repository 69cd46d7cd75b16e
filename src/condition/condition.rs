//! Readiness conditions.
//!
//! A condition is a named, repeatable predicate over the state of an
//! independently-evolving container process. Evaluations are expected
//! to be polled, so expected failure modes (connection refused, object
//! not yet registered) count as "not yet satisfied" and are never
//! surfaced as errors.

use crate::mgmt::client::ManagementClient;
use crate::mgmt::query::ObjectQuery;
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// A repeatable readiness predicate.
///
/// The `Display` impl must yield a stable, human-readable label naming
/// the probed target; it is what a timed-out wait reports.
pub trait Condition: fmt::Display + Send + Sync {
    fn satisfied(&self) -> bool;
}

/// Satisfied once a TCP connection to the target can be established.
pub struct PortReachable {
    host: String,
    port: u16,
    probe_timeout: Duration,
}

impl PortReachable {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        PortReachable {
            host: host.into(),
            port,
            probe_timeout: Duration::from_millis(250),
        }
    }
}

impl Condition for PortReachable {
    fn satisfied(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("Cannot resolve {}:{}: {}", self.host, self.port, e);
                return false;
            }
        };

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.probe_timeout).is_ok() {
                return true;
            }
        }
        log::debug!("Port {}:{} not reachable", self.host, self.port);
        false
    }
}

impl fmt::Display for PortReachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortReachable[{}:{}]", self.host, self.port)
    }
}

/// Satisfied once at least one managed object matching the query is
/// registered with the container's management endpoint.
pub struct ObjectExists {
    client: Arc<ManagementClient>,
    query: ObjectQuery,
}

impl ObjectExists {
    pub fn new(client: Arc<ManagementClient>, query: ObjectQuery) -> Self {
        ObjectExists { client, query }
    }
}

impl Condition for ObjectExists {
    fn satisfied(&self) -> bool {
        !self.client.query_objects(&self.query).is_empty()
    }
}

impl fmt::Display for ObjectExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectExists[{}]", self.query)
    }
}

/// Closure-backed condition for probes the built-ins do not cover.
pub struct FnCondition {
    label: String,
    probe: Box<dyn Fn() -> bool + Send + Sync>,
}

impl FnCondition {
    pub fn new(label: impl Into<String>, probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        FnCondition {
            label: label.into(),
            probe: Box::new(probe),
        }
    }
}

impl Condition for FnCondition {
    fn satisfied(&self) -> bool {
        (self.probe)()
    }
}

impl fmt::Display for FnCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition[{}]", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_port_reachable_against_live_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let condition = PortReachable::new("127.0.0.1", port);
        assert!(condition.satisfied());

        drop(listener);
        assert!(!condition.satisfied());
    }

    #[test]
    fn test_fn_condition_label() {
        let condition = FnCondition::new("artifact present", || true);
        assert!(condition.satisfied());
        assert_eq!(condition.to_string(), "Condition[artifact present]");
    }
}
