// src/core/services/events.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::identity::{AuthenticationVerdict, DoorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureKind {
    Face,
    Voice,
}

/// How an attempt ended and where it left the door.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub attempt_id: Uuid,
    pub verdict: AuthenticationVerdict,
    pub door: DoorState,
    pub started_at: DateTime<Utc>,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionPhase {
    Idle,
    Capturing(CaptureKind),
    Fusing,
    Actuating,
    Settled(Settlement),
}

impl SessionPhase {
    /// An attempt owns camera, microphone and door.
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::Settled(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Capturing(CaptureKind::Face) => "capturing_face",
            SessionPhase::Capturing(CaptureKind::Voice) => "capturing_voice",
            SessionPhase::Fusing => "fusing",
            SessionPhase::Actuating => "actuating",
            SessionPhase::Settled(_) => "settled",
        }
    }
}

/// Terminal event of an attempt, as shown to the person at the door.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictEvent {
    pub attempt_id: Uuid,
    pub success: bool,
    pub identity: String,
    pub reason: String,
    pub code: &'static str,
}

impl VerdictEvent {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        let verdict = &settlement.verdict;
        Self {
            attempt_id: settlement.attempt_id,
            success: verdict.is_authenticated(),
            identity: verdict.identity().unwrap_or("Unknown").to_string(),
            reason: verdict.message(),
            code: verdict.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DoorEvent {
    /// Human-readable progress.
    Status {
        attempt_id: Option<Uuid>,
        message: String,
    },
    PhaseChanged {
        attempt_id: Option<Uuid>,
        phase: SessionPhase,
    },
    Verdict(VerdictEvent),
    DoorStateChanged {
        state: DoorState,
    },
}

/// Fan-out of session events to any number of listeners.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DoorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: DoorEvent) {
        // no listeners is fine
        let _ = self.tx.send(event);
    }

    pub fn status(&self, attempt_id: Option<Uuid>, message: impl Into<String>) {
        self.emit(DoorEvent::Status {
            attempt_id,
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DoorEvent> {
        self.tx.subscribe()
    }
}
