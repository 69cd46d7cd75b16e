//! Core types and error taxonomy for the rigbox system.
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default remote management port used when the profile properties
/// artifact is absent or does not name one.
pub const DEFAULT_MANAGEMENT_PORT: u16 = 1099;

/// Property key carrying the remote management port inside the
/// per-profile properties artifact.
pub const PROP_MANAGEMENT_PORT: &str = "jvm.property.management.remote.port";

/// Environment variable overriding the container launch command name.
pub const ENV_CONTAINER_CMD: &str = "RIGBOX_CONTAINER_CMD";

/// Default container launch command name (platform suffix is appended
/// at launch time).
pub const DEFAULT_CONTAINER_CMD: &str = "rigbox-container";

/// Errors surfaced by the rig.
///
/// Transient failure modes (connection refused, object not yet
/// registered) are absorbed inside the polling primitives and never
/// reach this enum; only non-retryable conditions do.
#[derive(Error, Debug)]
pub enum RigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Managed object not found: {0}")]
    ObjectNotFound(String),

    #[error("No operation [{operation}] with {arity} parameter(s) on [{object}]")]
    OperationNotFound {
        object: String,
        operation: String,
        arity: usize,
    },

    #[error("The following conditions could not be satisfied: {}", unsatisfied.join(", "))]
    ConditionTimeout { unsatisfied: Vec<String> },
}

pub type Result<T> = std::result::Result<T, RigError>;

/// Configuration for a [`ContainerRunner`](crate::supervisor::ContainerRunner).
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Root of the container installation; the launch command lives in
    /// `bin/`, the per-profile properties artifact in `config/`.
    pub install_dir: PathBuf,
    /// Profile the container is started with.
    pub profile: String,
    /// Launch command override. When `None` the command is taken from
    /// the `RIGBOX_CONTAINER_CMD` environment variable, falling back to
    /// [`DEFAULT_CONTAINER_CMD`].
    pub command: Option<String>,
    /// Host the remote management endpoint is reached on.
    pub host: String,
}

impl RunnerConfig {
    pub fn new(install_dir: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        RunnerConfig {
            install_dir: install_dir.into(),
            profile: profile.into(),
            command: None,
            host: "localhost".to_string(),
        }
    }
}

/// Configuration for a container runtime instance.
#[derive(Clone, Debug)]
pub struct ContainerConfig {
    /// Profile selecting which sub-components this instance activates.
    pub profile: String,
    /// Root of the container installation.
    pub install_dir: PathBuf,
    /// Overall time allowed for the gated component activation phase.
    pub startup_timeout: Duration,
}

impl ContainerConfig {
    pub fn new(install_dir: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        ContainerConfig {
            profile: profile.into(),
            install_dir: install_dir.into(),
            startup_timeout: Duration::from_secs(30),
        }
    }
}
