// src/plugins/official/simulated_door/mod.rs
mod actuator;

pub use actuator::SimulatedActuator;
