// src/utils/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DoorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication attempt already in progress")]
    AlreadyInProgress,

    #[error("Door session is shut down")]
    ShutDown,

    #[error("Task error: {0}")]
    Task(String),
}

/// Camera or microphone could not deliver a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Capture cancelled")]
    Cancelled,

    #[error("Scratch storage error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// An embedding or scoring call failed inside a provider.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Audio load failed: {0}")]
    AudioLoad(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Similarity failed: {0}")]
    Similarity(String),

    #[error("Face detection failed: {0}")]
    Detection(String),
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Actuator unreachable: {0}")]
    Unreachable(String),

    #[error("Actuator command failed: {0}")]
    CommandFailed(String),
}

pub type Result<T> = std::result::Result<T, DoorError>;

impl From<tokio::task::JoinError> for DoorError {
    fn from(error: tokio::task::JoinError) -> Self {
        DoorError::Task(error.to_string())
    }
}
