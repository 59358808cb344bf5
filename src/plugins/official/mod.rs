// src/plugins/official/mod.rs
pub mod simulated_door;

pub use simulated_door::SimulatedActuator;
