// src/plugins/official/simulated_door/actuator.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::identity::DoorState;
use crate::plugins::traits::DoorActuator;
use crate::utils::config::ActuatorConfig;
use crate::utils::error::ActuatorError;

/// Door actuator used when no servo is attached. Models the servo travel
/// time and remembers the last commanded position.
pub struct SimulatedActuator {
    state: DoorState,
    travel_time: Duration,
    movements: Arc<AtomicU64>,
}

impl SimulatedActuator {
    pub fn new(config: &ActuatorConfig) -> Self {
        info!("Running door actuator in simulation mode");
        Self {
            state: DoorState::Closed,
            travel_time: config.travel_time(),
            movements: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of physical movements, shared so it can be read after the
    /// actuator has been handed to a session.
    pub fn movement_counter(&self) -> Arc<AtomicU64> {
        self.movements.clone()
    }

    fn travel_to(&mut self, target: DoorState) -> DoorState {
        if self.state == target {
            return self.state;
        }
        info!(from = %self.state, to = %target, "Moving door");
        if !self.travel_time.is_zero() {
            std::thread::sleep(self.travel_time);
        }
        self.state = target;
        self.movements.fetch_add(1, Ordering::SeqCst);
        self.state
    }
}

impl DoorActuator for SimulatedActuator {
    fn open(&mut self) -> Result<DoorState, ActuatorError> {
        Ok(self.travel_to(DoorState::Opened))
    }

    fn close(&mut self) -> Result<DoorState, ActuatorError> {
        Ok(self.travel_to(DoorState::Closed))
    }

    fn status(&self) -> Result<DoorState, ActuatorError> {
        Ok(self.state)
    }
}
