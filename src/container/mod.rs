//! Container-side runtime: components, managed object registry, the
//! management endpoint server and the shutdown sequencer.

pub mod component;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod shutdown;

pub use component::{ComponentState, ManagedComponent, TickerComponent};
pub use registry::{ManagedObject, ObjectRegistry};
pub use runtime::{component_token, Container, OBJECT_NAME_COMPONENT_INFO};
pub use server::{serve, ServerHandle};
pub use shutdown::{ShutdownSequencer, DEFAULT_EXIT_GRACE, DEFAULT_STEP_TIMEOUT, OBJECT_NAME_SHUTDOWN};
