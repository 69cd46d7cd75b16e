//! Container process supervisor.
//!
//! Launches the container as a child process, pumps its output into the
//! log, tracks its termination through a single-fire latch, and exposes
//! the lazily-created management client used both for readiness polling
//! and for commanding graceful shutdown. Starting is fire-and-forget;
//! readiness is established separately through the condition waiter.

use crate::config::properties::management_port;
use crate::config::types::{
    Result, RigError, RunnerConfig, DEFAULT_CONTAINER_CMD, ENV_CONTAINER_CMD,
};
use crate::container::shutdown::OBJECT_NAME_SHUTDOWN;
use crate::mgmt::client::ManagementClient;
use crate::supervisor::output::OutputPump;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

struct Lifecycle {
    started: bool,
    connector: Option<Arc<ManagementClient>>,
}

/// Supervisor for one container process. A runner handle is never
/// reused across a restart; create a fresh runner instead.
pub struct ContainerRunner {
    config: RunnerConfig,
    // Serializes start/stop/connector against each other.
    lifecycle: Mutex<Lifecycle>,
    exit_rx: Receiver<()>,
    exit_tx: Mutex<Option<Sender<()>>>,
    child_pid: Arc<Mutex<Option<u32>>>,
}

impl ContainerRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let (exit_tx, exit_rx) = bounded(1);
        ContainerRunner {
            config,
            lifecycle: Mutex::new(Lifecycle {
                started: false,
                connector: None,
            }),
            exit_rx,
            exit_tx: Mutex::new(Some(exit_tx)),
            child_pid: Arc::new(Mutex::new(None)),
        }
    }

    pub fn profile(&self) -> &str {
        &self.config.profile
    }

    /// Launch the container process. Idempotent per handle; returns as
    /// soon as the launch thread is running. Spawn failures after this
    /// point are logged and surface as an immediately-fired completion
    /// latch plus unreachable readiness conditions.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().expect("runner lock poisoned");
        if lifecycle.started {
            log::debug!("Container [{}] already started", self.config.profile);
            return Ok(());
        }

        let command_path = self.launch_command_path();
        if !command_path.exists() {
            return Err(RigError::Config(format!(
                "container command [{}] does not exist",
                command_path.display()
            )));
        }

        let exit_tx = self
            .exit_tx
            .lock()
            .expect("runner lock poisoned")
            .take()
            .ok_or_else(|| RigError::Process("completion latch already armed".to_string()))?;

        lifecycle.started = true;
        log::info!(
            "Starting container [{}] via [{}]",
            self.config.profile,
            command_path.display()
        );

        let profile = self.config.profile.clone();
        let child_pid = Arc::clone(&self.child_pid);

        let launcher = thread::Builder::new().name(format!("container-{}", profile));
        launcher
            .spawn(move || {
                let mut child = match Command::new(&command_path)
                    .arg(&profile)
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                {
                    Ok(child) => child,
                    Err(e) => {
                        log::error!("Failed to spawn container [{}]: {}", profile, e);
                        drop(exit_tx);
                        return;
                    }
                };

                *child_pid.lock().expect("runner lock poisoned") = Some(child.id());
                let pump = OutputPump::spawn(child.stdout.take(), child.stderr.take());

                match child.wait() {
                    Ok(status) => {
                        log::info!("Container [{}] exited with {}", profile, status)
                    }
                    Err(e) => log::error!("Waiting on container [{}] failed: {}", profile, e),
                }
                pump.join();

                // Dropping the sender fires the latch for every waiter.
                let _ = exit_tx.send(());
                drop(exit_tx);
            })
            .map_err(|e| RigError::Process(format!("failed to spawn launch thread: {}", e)))?;

        Ok(())
    }

    /// Command graceful shutdown through the remote `shutdown` operation
    /// on the well-known shutdown object. Does not wait for process
    /// exit; pair with [`ContainerRunner::wait_for_stop`].
    pub fn stop(&self) -> Result<()> {
        log::info!("Stopping container [{}]", self.config.profile);
        let connector = self.connector();
        connector.invoke(OBJECT_NAME_SHUTDOWN, "shutdown", &[])?;
        Ok(())
    }

    /// Block until the container process has actually exited. Returns
    /// immediately if it already has, or if it was never started.
    pub fn wait_for_stop(&self) {
        {
            let lifecycle = self.lifecycle.lock().expect("runner lock poisoned");
            if !lifecycle.started {
                log::warn!(
                    "Container [{}] was never started, nothing to wait for",
                    self.config.profile
                );
                return;
            }
        }
        // Fires on the exit message or on the sender being dropped.
        let _ = self.exit_rx.recv();
        log::debug!("Container [{}] completion latch fired", self.config.profile);
    }

    /// Forcibly terminate the container process: SIGTERM, a short wait,
    /// then SIGKILL. Last resort for containers that never accepted a
    /// graceful stop.
    #[cfg(unix)]
    pub fn destroy(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        use std::time::Duration;

        let pid = match *self.child_pid.lock().expect("runner lock poisoned") {
            Some(pid) => Pid::from_raw(pid as i32),
            None => {
                log::warn!(
                    "No live container process for [{}], nothing to destroy",
                    self.config.profile
                );
                return;
            }
        };

        log::warn!("Destroying container [{}] (pid {})", self.config.profile, pid);
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            log::debug!("SIGTERM to {} failed: {}", pid, e);
        }
        thread::sleep(Duration::from_millis(200));
        if let Err(e) = kill(pid, Signal::SIGKILL) {
            log::debug!("SIGKILL to {} failed: {}", pid, e);
        }
    }

    /// Management client bound to the discovered management port,
    /// created lazily on first use.
    pub fn connector(&self) -> Arc<ManagementClient> {
        let mut lifecycle = self.lifecycle.lock().expect("runner lock poisoned");
        if lifecycle.connector.is_none() {
            let port = self.find_management_port();
            log::debug!(
                "Creating management connector for [{}] at {}:{}",
                self.config.profile,
                self.config.host,
                port
            );
            lifecycle.connector = Some(Arc::new(ManagementClient::new(
                self.config.host.clone(),
                port,
            )));
        }
        Arc::clone(lifecycle.connector.as_ref().expect("connector just created"))
    }

    /// Discover the remote management port from the container's
    /// per-profile properties artifact, falling back to the documented
    /// default when the artifact is absent or unreadable.
    pub fn find_management_port(&self) -> u16 {
        management_port(&self.config.install_dir, &self.config.profile)
    }

    /// Full path of the launch command, platform suffix included.
    fn launch_command_path(&self) -> PathBuf {
        let base = self
            .config
            .command
            .clone()
            .or_else(|| std::env::var(ENV_CONTAINER_CMD).ok())
            .unwrap_or_else(|| DEFAULT_CONTAINER_CMD.to_string());

        let suffix = if cfg!(windows) { ".bat" } else { ".sh" };
        self.config.install_dir.join("bin").join(format!("{}{}", base, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_MANAGEMENT_PORT;

    #[test]
    fn test_launch_command_path_uses_platform_suffix() {
        let config = RunnerConfig::new("/opt/container", "common");
        let runner = ContainerRunner::new(config);
        let path = runner.launch_command_path();

        let expected = if cfg!(windows) {
            "rigbox-container.bat"
        } else {
            "rigbox-container.sh"
        };
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        assert!(path.starts_with("/opt/container"));
    }

    #[test]
    fn test_launch_command_override() {
        let mut config = RunnerConfig::new("/opt/container", "common");
        config.command = Some("custom".to_string());
        let runner = ContainerRunner::new(config);
        let name = runner.launch_command_path();
        assert!(name
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("custom."));
    }

    #[test]
    fn test_port_discovery_falls_back_without_artifact() {
        let config = RunnerConfig::new("/nonexistent/install", "common");
        let runner = ContainerRunner::new(config);
        assert_eq!(runner.find_management_port(), DEFAULT_MANAGEMENT_PORT);
    }

    #[test]
    fn test_start_rejects_missing_command() {
        let config = RunnerConfig::new("/nonexistent/install", "common");
        let runner = ContainerRunner::new(config);
        assert!(matches!(runner.start(), Err(RigError::Config(_))));
    }

    #[test]
    fn test_wait_for_stop_before_start_returns() {
        let config = RunnerConfig::new("/nonexistent/install", "common");
        let runner = ContainerRunner::new(config);
        // Must not block.
        runner.wait_for_stop();
    }
}
