// src/core/services/door.rs
//! Sequencing of one authentication attempt against the door:
//! `Idle -> Capturing(Face) -> Capturing(Voice) -> Fusing -> Actuating -> Settled`.
//!
//! At most one attempt runs per session. It executes on the tokio runtime,
//! with camera, microphone and model work on the blocking pool, and reports
//! back through the [`EventBus`] only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::events::{CaptureKind, DoorEvent, EventBus, SessionPhase, Settlement, VerdictEvent};
use super::face::FaceObservationAggregator;
use super::fusion::fuse;
use super::voice::{VoiceMatcher, VoiceSample};
use crate::core::identity::{AuthenticationVerdict, DoorState, MatchResult};
use crate::plugins::traits::{AudioRecorder, DoorActuator, FaceEmbeddingProvider, FrameSource};
use crate::plugins::Collaborators;
use crate::storage::{face_catalog_or_empty, voice_catalog_or_empty, CatalogStore};
use crate::utils::config::Config;
use crate::utils::error::{ActuatorError, CaptureError, DoorError, Result};

/// Snapshot returned by [`DoorSession::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub door: DoorState,
    pub attempt_id: Option<Uuid>,
    pub attempt_started_at: Option<DateTime<Utc>>,
    pub last_settlement: Option<Settlement>,
}

/// Handle to an attempt started by [`DoorSession::open_request`].
pub struct AttemptHandle {
    id: Uuid,
    join: JoinHandle<Settlement>,
}

impl AttemptHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn wait(self) -> Result<Settlement> {
        Ok(self.join.await?)
    }
}

#[derive(Debug, Clone, Copy)]
enum DoorCommand {
    Open,
    Close,
    Status,
}

enum AttemptFailure {
    Capture(CaptureError),
    Task(String),
}

impl From<CaptureError> for AttemptFailure {
    fn from(error: CaptureError) -> Self {
        AttemptFailure::Capture(error)
    }
}

impl From<JoinError> for AttemptFailure {
    fn from(error: JoinError) -> Self {
        AttemptFailure::Task(error.to_string())
    }
}

struct AttemptOutcome {
    verdict: AuthenticationVerdict,
    door: DoorState,
    cancelled: bool,
}

struct ActiveAttempt {
    id: Uuid,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

struct SessionState {
    phase: SessionPhase,
    door: DoorState,
    active: Option<ActiveAttempt>,
    last: Option<Settlement>,
    shut_down: bool,
}

struct SessionInner {
    config: Arc<Config>,
    frame_source: Arc<Mutex<Box<dyn FrameSource>>>,
    face_provider: Arc<dyn FaceEmbeddingProvider>,
    recorder: Arc<dyn AudioRecorder>,
    catalogs: Arc<dyn CatalogStore>,
    actuator: Arc<Mutex<Box<dyn DoorActuator>>>,
    aggregator: FaceObservationAggregator,
    matcher: VoiceMatcher,
    state: Mutex<SessionState>,
    busy: watch::Sender<bool>,
    events: EventBus,
    shutdown: CancellationToken,
}

/// Owner of one door: its actuator, its capture devices and the single
/// authentication attempt allowed at a time.
pub struct DoorSession {
    inner: Arc<SessionInner>,
}

impl DoorSession {
    /// Validates `config` and reads the initial door position. The actuator
    /// status call blocks, so call this outside the async worker threads or
    /// go through [`crate::Application::new`].
    pub fn new(config: Arc<Config>, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let Collaborators {
            frame_source,
            face_provider,
            voice_provider,
            recorder,
            catalogs,
            actuator,
        } = collaborators;

        let door = actuator.status().unwrap_or_else(|e| {
            error!(error = %e, "Door actuator unreachable at startup");
            DoorState::Unknown
        });
        let (busy, _) = watch::channel(false);

        let inner = SessionInner {
            aggregator: FaceObservationAggregator::new(&config.face),
            matcher: VoiceMatcher::new(voice_provider),
            events: EventBus::new(config.door.event_capacity),
            config,
            frame_source: Arc::new(Mutex::new(frame_source)),
            face_provider,
            recorder,
            catalogs,
            actuator: Arc::new(Mutex::new(actuator)),
            state: Mutex::new(SessionState {
                phase: SessionPhase::Idle,
                door,
                active: None,
                last: None,
                shut_down: false,
            }),
            busy,
            shutdown: CancellationToken::new(),
        };

        info!(door = %door, "Door session ready");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Starts a biometric attempt in the background. Refused with
    /// `AlreadyInProgress` while another attempt holds camera and microphone.
    pub fn open_request(&self) -> Result<AttemptHandle> {
        let (id, started_at, cancel) = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return Err(DoorError::ShutDown);
            }
            if state.phase.is_busy() {
                warn!(phase = state.phase.name(), "Open request refused; attempt in progress");
                return Err(DoorError::AlreadyInProgress);
            }

            let id = Uuid::new_v4();
            let started_at = Utc::now();
            let cancel = self.inner.shutdown.child_token();
            state.phase = SessionPhase::Capturing(CaptureKind::Face);
            state.active = Some(ActiveAttempt {
                id,
                started_at,
                cancel: cancel.clone(),
            });
            self.inner.busy.send_replace(true);
            (id, started_at, cancel)
        };

        info!(attempt_id = %id, "Authentication attempt started");
        self.inner.events.emit(DoorEvent::PhaseChanged {
            attempt_id: Some(id),
            phase: SessionPhase::Capturing(CaptureKind::Face),
        });

        let inner = self.inner.clone();
        let join = tokio::spawn(async move { inner.supervise(id, started_at, cancel).await });
        Ok(AttemptHandle { id, join })
    }

    /// Closes the door regardless of any attempt.
    pub async fn close_request(&self) -> Result<DoorState> {
        self.ensure_running()?;
        info!("Manual close requested");
        let door = self.inner.drive(DoorCommand::Close).await;
        let message = match door {
            DoorState::Closed => "door closed manually".to_string(),
            other => format!("door close failed; door is {}", other),
        };
        self.inner.events.status(None, message);
        Ok(door)
    }

    /// Administrative override: opens the door without authentication.
    pub async fn guest_open_request(&self) -> Result<DoorState> {
        {
            let state = self.inner.state.lock();
            if state.shut_down {
                return Err(DoorError::ShutDown);
            }
            if state.phase.is_busy() {
                return Err(DoorError::AlreadyInProgress);
            }
        }

        warn!(admin_override = true, "Guest access granted (admin override)");
        self.inner
            .events
            .status(None, "guest access granted (admin override)");
        Ok(self.inner.drive(DoorCommand::Open).await)
    }

    /// Never blocks on an attempt.
    pub fn status(&self) -> SessionStatus {
        let state = self.inner.state.lock();
        SessionStatus {
            phase: state.phase.clone(),
            door: state.door,
            attempt_id: state.active.as_ref().map(|a| a.id),
            attempt_started_at: state.active.as_ref().map(|a| a.started_at),
            last_settlement: state.last.clone(),
        }
    }

    /// Re-reads the door position from the actuator.
    pub async fn refresh_door_state(&self) -> Result<DoorState> {
        self.ensure_running()?;
        Ok(self.inner.drive(DoorCommand::Status).await)
    }

    /// Cancels the in-flight attempt, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let state = self.inner.state.lock();
        match &state.active {
            Some(attempt) => {
                info!(attempt_id = %attempt.id, "Cancelling attempt");
                attempt.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DoorEvent> {
        self.inner.events.subscribe()
    }

    /// Refuses new requests, cancels the running attempt and waits until it
    /// has cleaned up.
    pub async fn shutdown(&self) {
        self.inner.state.lock().shut_down = true;
        self.inner.shutdown.cancel();

        let mut busy = self.inner.busy.subscribe();
        // the sender lives in `inner`, so this only ends once the flag drops
        let _ = busy.wait_for(|busy| !*busy).await;
        info!("Door session shut down");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.inner.state.lock().shut_down {
            return Err(DoorError::ShutDown);
        }
        Ok(())
    }
}

impl SessionInner {
    async fn supervise(
        self: Arc<Self>,
        id: Uuid,
        started_at: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Settlement {
        let worker = tokio::spawn(self.clone().run_attempt(id, cancel));
        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(attempt_id = %id, error = %e, "Attempt aborted unexpectedly");
                AttemptOutcome {
                    verdict: AuthenticationVerdict::RejectedError {
                        detail: format!("internal failure: {}", e),
                    },
                    door: self.state.lock().door,
                    cancelled: false,
                }
            }
        };
        self.settle(id, started_at, outcome)
    }

    async fn run_attempt(self: Arc<Self>, id: Uuid, cancel: CancellationToken) -> AttemptOutcome {
        let verdict = match self.authenticate(id, &cancel).await {
            Ok(verdict) => verdict,
            Err(AttemptFailure::Capture(CaptureError::Cancelled)) => {
                info!(attempt_id = %id, "Attempt cancelled");
                return AttemptOutcome {
                    verdict: AuthenticationVerdict::RejectedError {
                        detail: "attempt cancelled".into(),
                    },
                    door: self.state.lock().door,
                    cancelled: true,
                };
            }
            Err(AttemptFailure::Capture(e)) => {
                error!(attempt_id = %id, error = %e, "Capture failed");
                AuthenticationVerdict::RejectedError {
                    detail: e.to_string(),
                }
            }
            Err(AttemptFailure::Task(detail)) => {
                error!(attempt_id = %id, error = %detail, "Attempt worker failed");
                AuthenticationVerdict::RejectedError { detail }
            }
        };

        self.set_phase(id, SessionPhase::Actuating);
        let command = if verdict.is_authenticated() {
            DoorCommand::Open
        } else {
            DoorCommand::Close
        };
        let door = self.drive(command).await;

        AttemptOutcome {
            verdict,
            door,
            cancelled: false,
        }
    }

    async fn authenticate(
        self: &Arc<Self>,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> std::result::Result<AuthenticationVerdict, AttemptFailure> {
        self.events
            .status(Some(id), "capturing and analyzing facial features");
        let report = {
            let inner = self.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let catalog = face_catalog_or_empty(inner.catalogs.as_ref());
                let mut source = inner.frame_source.lock();
                inner.aggregator.observe(
                    inner.config.face.window(),
                    &mut **source,
                    inner.face_provider.as_ref(),
                    &catalog,
                    &cancel,
                )
            })
            .await??
        };
        self.events.status(
            Some(id),
            format!(
                "face window closed after {} frames; recognized {}",
                report.frames, report.identities
            ),
        );
        if cancel.is_cancelled() {
            return Err(CaptureError::Cancelled.into());
        }

        self.set_phase(id, SessionPhase::Capturing(CaptureKind::Voice));
        self.events.status(
            Some(id),
            format!(
                "recording and analyzing voice ({:.1} seconds)",
                self.config.voice.recording_ms as f64 / 1000.0
            ),
        );
        let voice: MatchResult = {
            let inner = self.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let voice = &inner.config.voice;
                let catalog = voice_catalog_or_empty(inner.catalogs.as_ref());
                let sample = VoiceSample::capture(
                    inner.recorder.as_ref(),
                    &voice.recording_spec(),
                    voice.scratch_dir.as_deref(),
                    &cancel,
                )?;
                Ok::<_, CaptureError>(inner.matcher.match_sample(
                    sample,
                    &catalog,
                    voice.similarity_threshold,
                ))
            })
            .await??
        };
        if let Some(failure) = &voice.failure {
            self.events
                .status(Some(id), format!("voice scoring failed: {}", failure));
        }
        if cancel.is_cancelled() {
            return Err(CaptureError::Cancelled.into());
        }

        self.set_phase(id, SessionPhase::Fusing);
        let verdict = fuse(&report.identities, &voice);
        info!(
            attempt_id = %id,
            faces = %report.identities,
            voice = %voice.identity,
            score = voice.score,
            verdict = verdict.reason(),
            "Fused face and voice"
        );
        Ok(verdict)
    }

    fn set_phase(&self, id: Uuid, phase: SessionPhase) {
        self.state.lock().phase = phase.clone();
        info!(attempt_id = %id, phase = phase.name(), "Attempt phase");
        self.events.emit(DoorEvent::PhaseChanged {
            attempt_id: Some(id),
            phase,
        });
    }

    /// Runs one actuator command off the async threads. Any failure leaves
    /// the door `Unknown`, never assumed open or closed.
    async fn drive(&self, command: DoorCommand) -> DoorState {
        let actuator = self.actuator.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut actuator = actuator.lock();
            match command {
                DoorCommand::Open => actuator.open(),
                DoorCommand::Close => actuator.close(),
                DoorCommand::Status => actuator.status(),
            }
        })
        .await;

        let door = match outcome {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                error!(command = ?command, error = %e, "Door actuator failed; door state unknown");
                DoorState::Unknown
            }
            Err(e) => {
                let e = ActuatorError::CommandFailed(e.to_string());
                error!(command = ?command, error = %e, "Door actuator task failed; door state unknown");
                DoorState::Unknown
            }
        };
        self.set_door(door);
        door
    }

    fn set_door(&self, door: DoorState) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.door != door;
            state.door = door;
            changed
        };
        if changed {
            info!(door = %door, "Door state changed");
            self.events.emit(DoorEvent::DoorStateChanged { state: door });
        }
    }

    fn settle(&self, id: Uuid, started_at: DateTime<Utc>, outcome: AttemptOutcome) -> Settlement {
        let settlement = Settlement {
            attempt_id: id,
            verdict: outcome.verdict,
            door: outcome.door,
            started_at,
            settled_at: Utc::now(),
        };
        let phase = if outcome.cancelled {
            SessionPhase::Idle
        } else {
            SessionPhase::Settled(settlement.clone())
        };

        {
            let mut state = self.state.lock();
            state.phase = phase.clone();
            state.active = None;
            state.last = Some(settlement.clone());
            self.busy.send_replace(false);
        }

        self.events.emit(DoorEvent::PhaseChanged {
            attempt_id: Some(id),
            phase,
        });
        let event = VerdictEvent::from_settlement(&settlement);
        if event.success {
            info!(attempt_id = %id, identity = %event.identity, door = %settlement.door, "{}", event.reason);
        } else {
            warn!(attempt_id = %id, code = event.code, door = %settlement.door, "{}", event.reason);
        }
        self.events.emit(DoorEvent::Verdict(event));
        settlement
    }
}
