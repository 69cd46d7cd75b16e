//! rigbox: an integration rig for modular runtime containers.
//!
//! The rig boots a container as a separate process and drives it
//! through a black-box test lifecycle: start, wait for readiness, run
//! test logic, command graceful shutdown, observe exit.
//!
//! # Architecture
//!
//! Leaf-first:
//!
//! - [`barrier`]: multi-token completion barrier gating asynchronous
//!   startup stages; producers announce stages, consumers block on
//!   their own token subsets with a timeout.
//! - [`condition`]: named readiness predicates plus the sweep-polling
//!   waiter that blocks until an ordered condition list holds or a
//!   deadline expires, reporting what never became true.
//! - [`mgmt`]: the remote management plane; a line-framed JSON protocol
//!   over TCP, object naming/queries, and the client used both for
//!   readiness polling and for one-shot commands.
//! - [`supervisor`]: launches the container process, pumps its output
//!   into the log, tracks termination through a single-fire latch and
//!   hands out the lazily-bound management client.
//! - [`container`]: the pieces running inside the container process:
//!   components, the managed object registry, the endpoint server and
//!   the reverse-order, watchdog-bounded shutdown sequencer.
//! - [`config`]: error taxonomy, runner/container configuration and the
//!   per-profile properties artifact.
//!
//! # Lifecycle
//!
//! ```text
//! ContainerRunner::start()          spawn process, return immediately
//!          |
//! wait_on_condition(...)            PortReachable, ObjectExists, ...
//!          |
//! test logic                        query/invoke managed objects
//!          |
//! ContainerRunner::stop()           remote invoke "shutdown"
//!          |                            |
//!          |                        ShutdownSequencer: reverse order,
//!          |                        per-step watchdog, grace delay,
//!          |                        process exit
//! wait_for_stop()                   completion latch fires
//! ```
//!
//! # Design principles
//!
//! 1. **Transient failure is data** - connection refused and missing
//!    objects are "not ready yet", absorbed inside the polling
//!    primitives, never thrown.
//! 2. **Deterministic diagnostics** - conditions are checked in a fixed
//!    order and timeouts report exactly what never held, in that order.
//! 3. **Best-effort teardown** - an uncooperative component is
//!    abandoned after its watchdog, not allowed to stall process exit.
//! 4. **No hidden registries** - barriers and registries are explicit,
//!    dependency-injected instances owned by whoever orchestrates the
//!    lifecycle.

// Configuration & error taxonomy
pub mod config;

// Startup completion barrier
pub mod barrier;

// Readiness conditions & polling waiter
pub mod condition;

// Remote management plane
pub mod mgmt;

// Container-side runtime
pub mod container;

// Process supervision
pub mod supervisor;

// Re-export commonly used types for convenience
pub use barrier::{CompletionBarrier, WaitOutcome};
pub use condition::{
    wait_on_condition, wait_with_defaults, Condition, FnCondition, ObjectExists, PortReachable,
};
pub use config::types::{ContainerConfig, Result, RigError, RunnerConfig};
pub use container::{
    ComponentState, Container, ManagedComponent, ObjectRegistry, ShutdownSequencer,
    OBJECT_NAME_SHUTDOWN,
};
pub use mgmt::{ManagementClient, ObjectInfo, ObjectName, ObjectQuery};
pub use supervisor::ContainerRunner;
