//! Configuration and shared type definitions.

pub mod properties;
pub mod types;

pub use properties::{load_properties, management_port, profile_properties_path};
pub use types::{ContainerConfig, Result, RigError, RunnerConfig};
