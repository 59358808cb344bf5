// src/core/identity/mod.rs
pub mod similarity;
pub mod types;

pub use types::{
    AuthenticationVerdict, BoundingBox, DoorState, Embedding, Identity, IdentitySet, MatchResult,
};
