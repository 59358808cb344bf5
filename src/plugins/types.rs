// src/plugins/types.rs
use std::sync::Arc;

use super::traits::{
    AudioRecorder, DoorActuator, FaceEmbeddingProvider, FrameSource, VoiceEmbeddingProvider,
};
use crate::storage::CatalogStore;

/// Everything a door session needs from the outside world.
pub struct Collaborators {
    pub frame_source: Box<dyn FrameSource>,
    pub face_provider: Arc<dyn FaceEmbeddingProvider>,
    pub voice_provider: Arc<dyn VoiceEmbeddingProvider>,
    pub recorder: Arc<dyn AudioRecorder>,
    pub catalogs: Arc<dyn CatalogStore>,
    pub actuator: Box<dyn DoorActuator>,
}
