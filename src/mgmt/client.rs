//! Remote management client.
//!
//! Wraps one TCP connection to a container's management endpoint.
//! Connect attempts happen inside polling loops, so they must never
//! abort the loop: `connect` swallows failures and leaves the client
//! observably "not connected". Queries degrade to empty results on any
//! network failure; an explicit `invoke` is a deliberate one-shot
//! command whose failure is propagated.

use crate::config::types::{Result, RigError};
use crate::mgmt::protocol::{read_frame, write_frame, McRequest, McResponse, ObjectInfo};
use crate::mgmt::query::ObjectQuery;
use serde_json::Value;
use std::collections::HashMap;
use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a single request may take before the connection is
/// considered dead. Generous because a remote shutdown invocation only
/// answers after the container has sequenced its components down.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ManagementClient {
    host: String,
    port: u16,
    connected: AtomicBool,
    // Guards the stream for both connection management and the
    // request/response exchange, so concurrent pollers cannot interleave
    // frames or race duplicate connect attempts.
    stream: Mutex<Option<TcpStream>>,
}

impl ManagementClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ManagementClient {
            host: host.into(),
            port,
            connected: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Establish the connection once. Idempotent; on failure the client
    /// stays "not connected" and silently returns.
    pub fn connect(&self) {
        let mut stream = self.stream.lock().expect("client lock poisoned");
        if stream.is_some() {
            return;
        }

        match self.open_stream() {
            Ok(s) => {
                log::debug!("Connected to management endpoint {}:{}", self.host, self.port);
                *stream = Some(s);
                self.connected.store(true, Ordering::Release);
            }
            Err(e) => {
                log::debug!(
                    "Management endpoint {}:{} not reachable: {}",
                    self.host,
                    self.port,
                    e
                );
                self.connected.store(false, Ordering::Release);
            }
        }
    }

    /// Close the connection if open. Idempotent; close errors are
    /// swallowed.
    pub fn disconnect(&self) {
        let mut stream = self.stream.lock().expect("client lock poisoned");
        if stream.take().is_some() {
            log::debug!(
                "Disconnected from management endpoint {}:{}",
                self.host,
                self.port
            );
        }
        self.connected.store(false, Ordering::Release);
    }

    // Hostnames like "localhost" can resolve to both v6 and v4; try
    // every address before giving up.
    fn open_stream(&self) -> std::io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(REQUEST_TIMEOUT))?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{}:{} did not resolve", self.host, self.port),
            )
        }))
    }

    /// One request/response exchange. Any failure tears the connection
    /// down so the next lazy connect starts clean.
    fn request(&self, request: &McRequest) -> Result<McResponse> {
        let mut guard = self.stream.lock().expect("client lock poisoned");
        let stream = guard
            .as_mut()
            .ok_or_else(|| RigError::Connect("not connected".to_string()))?;

        let exchange = (|| {
            write_frame(stream, request)?;
            let mut reader = BufReader::new(&*stream);
            read_frame::<McResponse, _>(&mut reader)
        })();

        if exchange.is_err() {
            guard.take();
            self.connected.store(false, Ordering::Release);
        }
        exchange
    }

    /// Enumerate all registered managed objects and return those
    /// matching the query. Returns an empty map when not connected or
    /// when nothing matches, never an error.
    pub fn query_objects(&self, query: &ObjectQuery) -> HashMap<String, ObjectInfo> {
        self.connect();
        if !self.is_connected() {
            return HashMap::new();
        }

        let objects = match self.request(&McRequest::ListObjects) {
            Ok(McResponse::Objects { objects }) => objects,
            Ok(other) => {
                log::debug!("Unexpected response to object listing: {:?}", other);
                return HashMap::new();
            }
            Err(e) => {
                log::debug!("Object listing failed: {}", e);
                return HashMap::new();
            }
        };

        objects
            .into_iter()
            .filter(|info| query.matches(info))
            .map(|info| (info.name.clone(), info))
            .collect()
    }

    /// Fetch the metadata of a single managed object, or `None` when not
    /// connected, unknown, or on any network failure.
    pub fn describe(&self, object: &str) -> Option<ObjectInfo> {
        self.connect();
        if !self.is_connected() {
            return None;
        }

        match self.request(&McRequest::DescribeObject {
            object: object.to_string(),
        }) {
            Ok(McResponse::Object { info }) => info,
            Ok(other) => {
                log::debug!("Unexpected response describing [{}]: {:?}", object, other);
                None
            }
            Err(e) => {
                log::debug!("Describing [{}] failed: {}", object, e);
                None
            }
        }
    }

    /// Invoke a managed operation, matching on name and parameter arity
    /// and using the declared parameter types as the signature.
    ///
    /// Unlike the query paths this propagates failures: the caller of a
    /// deliberate command must know whether it was accepted.
    pub fn invoke(&self, object: &str, operation: &str, params: &[Value]) -> Result<Value> {
        self.connect();
        if !self.is_connected() {
            return Err(RigError::Connect(format!(
                "management endpoint {}:{} not reachable",
                self.host, self.port
            )));
        }

        let info = self
            .describe(object)
            .ok_or_else(|| RigError::ObjectNotFound(object.to_string()))?;

        let op = info
            .operations
            .iter()
            .find(|op| op.name == operation && op.params.len() == params.len())
            .ok_or_else(|| RigError::OperationNotFound {
                object: object.to_string(),
                operation: operation.to_string(),
                arity: params.len(),
            })?;

        let response = self.request(&McRequest::Invoke {
            object: object.to_string(),
            operation: operation.to_string(),
            params: params.to_vec(),
            signature: op.signature(),
        })?;

        match response {
            McResponse::InvokeResult { value } => Ok(value),
            McResponse::Error { message } => Err(RigError::Protocol(message)),
            other => Err(RigError::Protocol(format!(
                "unexpected response to invoke: {:?}",
                other
            ))),
        }
    }
}
