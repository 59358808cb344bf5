// src/plugins/mod.rs
pub mod official;
pub mod traits;
pub mod types;

pub use types::Collaborators;
