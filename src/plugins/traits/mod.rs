// src/plugins/traits/mod.rs
//! Contracts of the collaborators the decision core drives: camera,
//! microphone, embedding models and the door hardware.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::core::identity::{BoundingBox, DoorState, Embedding};
use crate::utils::error::{ActuatorError, CaptureError, ModelError};

/// One decoded camera frame. Pixel layout is a matter between the frame
/// source and the face provider.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

pub trait FrameSource: Send {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Non-blocking poll. `None` when no frame is ready or the read failed.
    fn read(&mut self) -> Option<Frame>;

    fn stop(&mut self);
}

#[cfg_attr(test, mockall::automock)]
pub trait FaceEmbeddingProvider: Send + Sync {
    fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, ModelError>;

    /// One embedding per box, in box order.
    fn encode(&self, frame: &Frame, boxes: &[BoundingBox]) -> Result<Vec<Embedding>, ModelError>;

    /// One flag per entry of `known`.
    fn compare_many(&self, known: &[Embedding], candidate: &Embedding) -> Vec<bool>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

#[cfg_attr(test, mockall::automock)]
pub trait VoiceEmbeddingProvider: Send + Sync {
    fn load_audio(&self, path: &Path) -> Result<Waveform, ModelError>;

    fn embed(&self, waveform: &Waveform) -> Result<Embedding, ModelError>;

    /// Higher means more alike. The range is provider specific and the
    /// similarity threshold is calibrated against it.
    fn similarity(&self, a: &Embedding, b: &Embedding) -> Result<f32, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSpec {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

#[cfg_attr(test, mockall::automock)]
pub trait AudioRecorder: Send + Sync {
    /// Blocks for `spec.duration` and writes the recording to `path`.
    /// Returns `CaptureError::Cancelled` promptly once `cancel` fires.
    fn record(
        &self,
        path: &Path,
        spec: &RecordingSpec,
        cancel: &CancellationToken,
    ) -> Result<(), CaptureError>;
}

/// Physical door primitive. Calls are synchronous and idempotent: opening an
/// open door or closing a closed one reports the state without moving.
#[cfg_attr(test, mockall::automock)]
pub trait DoorActuator: Send {
    fn open(&mut self) -> Result<DoorState, ActuatorError>;

    fn close(&mut self) -> Result<DoorState, ActuatorError>;

    fn status(&self) -> Result<DoorState, ActuatorError>;
}
