//! Management endpoint server.
//!
//! A plain TCP listener serving the line-framed JSON protocol against
//! the container's object registry, one thread per connection.

use crate::config::types::Result;
use crate::container::registry::ObjectRegistry;
use crate::mgmt::protocol::{read_frame, write_frame, McRequest, McResponse};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle on a running management server. Dropping it does not stop the
/// accept loop; call [`ServerHandle::shutdown`] for an orderly stop.
pub struct ServerHandle {
    port: u16,
    stop_tx: Sender<()>,
    accept_thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Port the listener is actually bound to (useful when binding to
    /// port 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting connections and join the accept loop. Connections
    /// already being served run to completion on their own threads.
    pub fn shutdown(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Bind the management endpoint and start serving the registry.
pub fn serve(registry: Arc<ObjectRegistry>, host: &str, port: u16) -> Result<ServerHandle> {
    let listener = TcpListener::bind((host, port))?;
    listener.set_nonblocking(true)?;
    let local_port = listener.local_addr()?.port();

    log::info!("Management endpoint listening on {}:{}", host, local_port);

    let (stop_tx, stop_rx) = bounded(1);
    let accept_thread = thread::spawn(move || accept_loop(listener, registry, stop_rx));

    Ok(ServerHandle {
        port: local_port,
        stop_tx,
        accept_thread: Some(accept_thread),
    })
}

fn accept_loop(listener: TcpListener, registry: Arc<ObjectRegistry>, stop_rx: Receiver<()>) {
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                log::debug!("Management endpoint accept loop stopping");
                return;
            }
            Err(TryRecvError::Empty) => {}
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                log::debug!("Management connection from {}", peer);
                let registry = Arc::clone(&registry);
                thread::spawn(move || serve_connection(stream, registry));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!("Management endpoint accept failed: {}", e);
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

fn serve_connection(stream: TcpStream, registry: Arc<ObjectRegistry>) {
    // Accepted sockets inherit the listener's nonblocking flag on some
    // platforms; the per-connection loop wants blocking reads.
    if let Err(e) = stream.set_nonblocking(false) {
        log::warn!("Cannot switch management connection to blocking: {}", e);
        return;
    }
    if let Err(e) = stream.set_nodelay(true) {
        log::debug!("set_nodelay failed: {}", e);
    }

    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            log::warn!("Cannot clone management connection: {}", e);
            return;
        }
    };
    let mut reader = BufReader::new(stream);

    loop {
        let request: McRequest = match read_frame(&mut reader) {
            Ok(request) => request,
            Err(e) => {
                // Peers disconnect between polls as a matter of course.
                log::debug!("Management connection closed: {}", e);
                return;
            }
        };

        let response = handle_request(&registry, request);
        if let Err(e) = write_frame(&mut writer, &response) {
            log::debug!("Management connection write failed: {}", e);
            return;
        }
    }
}

fn handle_request(registry: &ObjectRegistry, request: McRequest) -> McResponse {
    match request {
        McRequest::ListObjects => McResponse::Objects {
            objects: registry.list(),
        },
        McRequest::DescribeObject { object } => McResponse::Object {
            info: registry.describe(&object),
        },
        McRequest::Invoke {
            object,
            operation,
            params,
            signature,
        } => {
            log::info!(
                "Remote invoke [{}] on [{}] with signature {:?}",
                operation,
                object,
                signature
            );
            match registry.invoke(&object, &operation, &params) {
                Ok(value) => McResponse::InvokeResult { value },
                Err(e) => McResponse::Error {
                    message: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::RigError;
    use crate::container::registry::ManagedObject;
    use crate::mgmt::client::ManagementClient;
    use crate::mgmt::query::{ObjectName, ObjectQuery};
    use serde_json::json;

    fn test_registry() -> Arc<ObjectRegistry> {
        let registry = ObjectRegistry::new();
        registry
            .register(
                ManagedObject::new(&ObjectName::new("rigbox", "Echo")).with_operation(
                    "echo",
                    &[("message", "string")],
                    |params| Ok(params[0].clone()),
                ),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_client_server_query_and_invoke() {
        let handle = serve(test_registry(), "127.0.0.1", 0).unwrap();
        let client = ManagementClient::new("127.0.0.1", handle.port());

        let matching = client.query_objects(&ObjectQuery::new("rigbox", "Echo"));
        assert_eq!(matching.len(), 1);
        assert!(matching.contains_key("rigbox:type=Echo"));

        let nothing = client.query_objects(&ObjectQuery::new("absent", "Echo"));
        assert!(nothing.is_empty());

        let result = client
            .invoke("rigbox:type=Echo", "echo", &[json!("ping")])
            .unwrap();
        assert_eq!(result, json!("ping"));

        client.disconnect();
        handle.shutdown();
    }

    #[test]
    fn test_invoke_arity_mismatch_reported_to_client() {
        let handle = serve(test_registry(), "127.0.0.1", 0).unwrap();
        let client = ManagementClient::new("127.0.0.1", handle.port());

        let result = client.invoke("rigbox:type=Echo", "echo", &[]);
        assert!(matches!(
            result,
            Err(RigError::OperationNotFound { arity: 0, .. })
        ));

        client.disconnect();
        handle.shutdown();
    }

    #[test]
    fn test_describe_unknown_object_is_none() {
        let handle = serve(test_registry(), "127.0.0.1", 0).unwrap();
        let client = ManagementClient::new("127.0.0.1", handle.port());

        assert!(client.describe("rigbox:type=Nope").is_none());

        client.disconnect();
        handle.shutdown();
    }
}
