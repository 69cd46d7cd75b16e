//! Container runtime.
//!
//! Ties the container-side pieces together: activates the profile's
//! components in order, announcing each activation through the
//! completion barrier, registers the well-known managed objects, binds
//! the management endpoint, and parks until the shutdown sequencer
//! terminates the process.

use crate::barrier::CompletionBarrier;
use crate::config::properties::management_port;
use crate::config::types::{ContainerConfig, Result, RigError};
use crate::container::component::ManagedComponent;
use crate::container::registry::{ManagedObject, ObjectRegistry};
use crate::container::server;
use crate::container::shutdown::ShutdownSequencer;
use crate::mgmt::query::ObjectName;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Qualified name of the component information object.
pub const OBJECT_NAME_COMPONENT_INFO: &str = "rigbox:type=ComponentInfo";

/// Completion token announced for one activated component.
pub fn component_token(id: &str) -> String {
    format!("component.{}", id)
}

pub struct Container {
    config: ContainerConfig,
    components: Vec<Arc<dyn ManagedComponent>>,
    barrier: Arc<CompletionBarrier>,
    registry: Arc<ObjectRegistry>,
}

impl Container {
    pub fn new(config: ContainerConfig, components: Vec<Arc<dyn ManagedComponent>>) -> Self {
        Container {
            config,
            components,
            barrier: Arc::new(CompletionBarrier::new()),
            registry: Arc::new(ObjectRegistry::new()),
        }
    }

    /// The barrier gating this container's startup stages. Components
    /// with asynchronous startup phases may complete their own tokens
    /// through it.
    pub fn barrier(&self) -> Arc<CompletionBarrier> {
        Arc::clone(&self.barrier)
    }

    pub fn registry(&self) -> Arc<ObjectRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the container until the shutdown sequencer terminates the
    /// process. Only returns early on a startup error.
    pub fn run(self) -> Result<()> {
        log::info!("Starting container profile [{}]", self.config.profile);

        self.activate_components()?;
        self.register_component_info()?;

        let sequencer = Arc::new(ShutdownSequencer::new(self.components.clone()));
        sequencer.register(&self.registry)?;

        let port = management_port(&self.config.install_dir, &self.config.profile);
        let handle = server::serve(Arc::clone(&self.registry), "127.0.0.1", port)?;

        log::info!(
            "Container [{}] ready, management endpoint on port {}",
            self.config.profile,
            handle.port()
        );

        // The process ends through the sequencer's scheduled exit.
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }

    /// Start every component in activation order, completing one barrier
    /// token per successful start, then gate on the full token set. A
    /// component failing to start does not abort the others; it simply
    /// never completes its token, which the gate reports.
    fn activate_components(&self) -> Result<()> {
        let tokens: Vec<String> = self
            .components
            .iter()
            .map(|c| component_token(c.id()))
            .collect();

        for component in &self.components {
            match component.start() {
                Ok(()) => self.barrier.complete(&component_token(component.id())),
                Err(e) => log::error!("Component [{}] failed to start: {}", component.id(), e),
            }
        }

        let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let outcome =
            self.barrier
                .wait_for_tokens("container-start", self.config.startup_timeout, &token_refs);

        if !outcome.is_complete() {
            return Err(RigError::Config(format!(
                "components failed to activate: {:?}",
                outcome.remaining
            )));
        }
        Ok(())
    }

    fn register_component_info(&self) -> Result<()> {
        let components = self.components.clone();
        self.registry.register(
            ManagedObject::new(&ObjectName::new("rigbox", "ComponentInfo")).with_operation(
                "listComponents",
                &[],
                move |_params| {
                    let listing: Vec<_> = components
                        .iter()
                        .map(|c| json!({"id": c.id(), "state": c.state()}))
                        .collect();
                    Ok(json!(listing))
                },
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::component::TickerComponent;

    #[test]
    fn test_component_token_format() {
        assert_eq!(component_token("scheduler"), "component.scheduler");
    }

    #[test]
    fn test_activation_completes_barrier_tokens() {
        let config = ContainerConfig::new(std::env::temp_dir(), "unit");
        let components: Vec<Arc<dyn ManagedComponent>> =
            vec![Arc::new(TickerComponent::new("a")), Arc::new(TickerComponent::new("b"))];
        let container = Container::new(config, components);
        let barrier = container.barrier();

        container.activate_components().unwrap();
        assert!(barrier.is_completed("component.a"));
        assert!(barrier.is_completed("component.b"));
    }

    #[test]
    fn test_component_info_lists_states() {
        let config = ContainerConfig::new(std::env::temp_dir(), "unit");
        let components: Vec<Arc<dyn ManagedComponent>> =
            vec![Arc::new(TickerComponent::new("a"))];
        let container = Container::new(config, components);

        container.activate_components().unwrap();
        container.register_component_info().unwrap();

        let listing = container
            .registry()
            .invoke(OBJECT_NAME_COMPONENT_INFO, "listComponents", &[])
            .unwrap();
        assert_eq!(listing, json!([{"id": "a", "state": "active"}]));
    }
}
