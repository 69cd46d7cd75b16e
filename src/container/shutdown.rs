//! Ordered, time-bounded shutdown sequencer.
//!
//! Runs inside the container process. Components are stopped strictly
//! in reverse activation order, one at a time, mirroring dependency
//! teardown; each individual stop runs on its own worker thread under a
//! watchdog so one unresponsive component cannot stall the sequence.
//! An abandoned worker is left to finish or die with the process, never
//! forcibly killed. Once every component has been processed the
//! sequencer schedules process exit after a short grace delay so the
//! remote caller's invocation response can be flushed first.

use crate::config::types::Result;
use crate::container::component::{ComponentState, ManagedComponent};
use crate::container::registry::{ManagedObject, ObjectRegistry};
use crate::mgmt::query::ObjectName;
use crossbeam_channel::{bounded, RecvTimeoutError};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Qualified name of the well-known shutdown object.
pub const OBJECT_NAME_SHUTDOWN: &str = "rigbox:type=ShutdownBean";

/// Watchdog for one component's stop transition.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between the end of the sequence and process exit.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(1);

const STATE_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ShutdownSequencer {
    // Activation order; shutdown walks this in reverse.
    components: Vec<Arc<dyn ManagedComponent>>,
    step_timeout: Duration,
    exit_grace: Duration,
    exit_process: bool,
}

impl ShutdownSequencer {
    pub fn new(components: Vec<Arc<dyn ManagedComponent>>) -> Self {
        ShutdownSequencer {
            components,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            exit_grace: DEFAULT_EXIT_GRACE,
            exit_process: true,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    /// Disable the scheduled process exit; embedding tests use this to
    /// observe the sequence without losing their own process.
    pub fn without_process_exit(mut self) -> Self {
        self.exit_process = false;
        self
    }

    /// Expose the sequencer as the well-known `ShutdownBean` managed
    /// object with its zero-argument `shutdown` operation.
    pub fn register(self: &Arc<Self>, registry: &ObjectRegistry) -> Result<()> {
        let sequencer = Arc::clone(self);
        registry.register(
            ManagedObject::new(&ObjectName::new("rigbox", "ShutdownBean")).with_operation(
                "shutdown",
                &[],
                move |_params| {
                    sequencer.shutdown();
                    Ok(json!(null))
                },
            ),
        )
    }

    /// Stop all active components in reverse activation order, then
    /// schedule process termination and return to the caller.
    ///
    /// A stop failure or watchdog expiry is logged and does not prevent
    /// subsequent components from being processed; shutdown is
    /// one-directional and best-effort.
    pub fn shutdown(&self) {
        log::info!("Shutdown sequence starting ({} components)", self.components.len());

        for component in self.components.iter().rev() {
            if component.state() != ComponentState::Active {
                log::debug!(
                    "Skipping component [{}] in state [{}]",
                    component.id(),
                    component.state()
                );
                continue;
            }
            self.stop_component(component);
        }

        if self.exit_process {
            let grace = self.exit_grace;
            log::info!("Terminating container process in {:?}", grace);
            thread::spawn(move || {
                thread::sleep(grace);
                std::process::exit(0);
            });
        } else {
            log::info!("Shutdown sequence finished, process exit disabled");
        }
    }

    fn stop_component(&self, component: &Arc<dyn ManagedComponent>) {
        log::info!("Stopping component [{}]", component.id());

        let worker_component = Arc::clone(component);
        let step_timeout = self.step_timeout;
        let (done_tx, done_rx) = bounded(1);

        let worker = thread::spawn(move || {
            let started = Instant::now();

            if let Err(e) = worker_component.stop() {
                log::error!(
                    "Failed to stop component [{}]: {}",
                    worker_component.id(),
                    e
                );
            }

            while worker_component.state() != ComponentState::Stopped
                && started.elapsed() < step_timeout
            {
                thread::sleep(STATE_POLL_INTERVAL);
            }

            let _ = done_tx.send(worker_component.state());
        });

        // The worker bounds its own poll by the watchdog; the margin only
        // covers a stop() call that itself blocks.
        match done_rx.recv_timeout(self.step_timeout + Duration::from_millis(500)) {
            Ok(ComponentState::Stopped) => {
                log::info!("Component [{}] stopped", component.id());
                let _ = worker.join();
            }
            Ok(state) => {
                log::warn!(
                    "Component [{}] did not stop within {:?} (state [{}]), abandoning",
                    component.id(),
                    self.step_timeout,
                    state
                );
                let _ = worker.join();
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                log::warn!(
                    "Stop worker for component [{}] unresponsive, abandoning",
                    component.id()
                );
            }
        }
    }
}
