//! Container sub-components.
//!
//! A component is the unit the shutdown sequencer operates on: it has a
//! stable id, reports a lifecycle state, and its stop operation only
//! initiates the transition; callers poll [`ManagedComponent::state`]
//! until it reaches [`ComponentState::Stopped`].

use crate::config::types::Result;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Starting,
    Active,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentState::Starting => "starting",
            ComponentState::Active => "active",
            ComponentState::Stopping => "stopping",
            ComponentState::Stopped => "stopped",
            ComponentState::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub trait ManagedComponent: Send + Sync {
    fn id(&self) -> &str;
    fn state(&self) -> ComponentState;
    fn start(&self) -> Result<()>;
    /// Initiate the stop transition. Must not block on the component
    /// actually reaching [`ComponentState::Stopped`].
    fn stop(&self) -> Result<()>;
}

/// Reference component: a background worker ticking on an interval
/// until asked to stop. The default container profiles are assembled
/// from these.
pub struct TickerComponent {
    id: String,
    tick_interval: Duration,
    state: Arc<Mutex<ComponentState>>,
    stop_flag: Arc<AtomicBool>,
}

impl TickerComponent {
    pub fn new(id: impl Into<String>) -> Self {
        TickerComponent {
            id: id.into(),
            tick_interval: Duration::from_millis(250),
            state: Arc::new(Mutex::new(ComponentState::Starting)),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set_state(state: &Mutex<ComponentState>, value: ComponentState) {
        *state.lock().expect("component lock poisoned") = value;
    }
}

impl ManagedComponent for TickerComponent {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> ComponentState {
        *self.state.lock().expect("component lock poisoned")
    }

    fn start(&self) -> Result<()> {
        let id = self.id.clone();
        let state = Arc::clone(&self.state);
        let stop_flag = Arc::clone(&self.stop_flag);
        let interval = self.tick_interval;

        thread::spawn(move || {
            log::debug!("Component [{}] worker running", id);
            while !stop_flag.load(Ordering::Acquire) {
                thread::sleep(interval);
            }
            Self::set_state(&state, ComponentState::Stopped);
            log::debug!("Component [{}] worker stopped", id);
        });

        Self::set_state(&self.state, ComponentState::Active);
        log::info!("Component [{}] active", self.id);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        log::info!("Stopping component [{}]", self.id);
        Self::set_state(&self.state, ComponentState::Stopping);
        self.stop_flag.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_ticker_lifecycle() {
        let ticker = TickerComponent::new("worker");
        assert_eq!(ticker.state(), ComponentState::Starting);

        ticker.start().unwrap();
        assert_eq!(ticker.state(), ComponentState::Active);

        ticker.stop().unwrap();
        let started = Instant::now();
        while ticker.state() != ComponentState::Stopped {
            assert!(
                started.elapsed() < Duration::from_secs(2),
                "ticker never stopped"
            );
            thread::sleep(Duration::from_millis(10));
        }
    }
}
