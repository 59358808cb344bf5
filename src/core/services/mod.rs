// src/core/services/mod.rs
pub mod door;
pub mod events;
pub mod face;
pub mod fusion;
pub mod voice;

pub use door::{AttemptHandle, DoorSession, SessionStatus};
pub use events::{CaptureKind, DoorEvent, EventBus, SessionPhase, Settlement, VerdictEvent};
pub use face::{majority_vote, FaceObservationAggregator, ObservationReport, RecognitionTracker};
pub use fusion::fuse;
pub use voice::{VoiceMatcher, VoiceSample};
