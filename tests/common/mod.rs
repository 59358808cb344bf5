// tests/common/mod.rs
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use doorguard::{
    core::{identity::*, services::*},
    plugins::{official::SimulatedActuator, traits::*, Collaborators},
    storage::*,
    utils::{
        config::Config,
        error::{CaptureError, ModelError},
    },
};

pub const ALICE: u8 = 1;
pub const BOB: u8 = 2;
pub const STRANGER: u8 = 9;

/// Camera whose frames carry one byte per visible face; the byte is that
/// face's id. Every other poll comes back empty.
pub struct ScriptedCamera {
    faces: Vec<u8>,
    ready: bool,
    fail_start: bool,
}

impl FrameSource for ScriptedCamera {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.fail_start {
            return Err(CaptureError::CameraUnavailable("no /dev/video0".into()));
        }
        Ok(())
    }

    fn read(&mut self) -> Option<Frame> {
        self.ready = !self.ready;
        if !self.ready {
            return None;
        }
        Some(Frame {
            width: 640,
            height: 480,
            data: self.faces.clone(),
            captured_at: Utc::now(),
        })
    }

    fn stop(&mut self) {}
}

/// Embeds a face as its id and matches on equality.
pub struct IdFaces;

impl FaceEmbeddingProvider for IdFaces {
    fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, ModelError> {
        Ok(frame
            .data
            .iter()
            .map(|&id| BoundingBox {
                top: id as u32,
                right: id as u32 + 10,
                bottom: id as u32 + 10,
                left: id as u32,
            })
            .collect())
    }

    fn encode(&self, _frame: &Frame, boxes: &[BoundingBox]) -> Result<Vec<Embedding>, ModelError> {
        Ok(boxes.iter().map(|b| vec![b.top as f32]).collect())
    }

    fn compare_many(&self, known: &[Embedding], candidate: &Embedding) -> Vec<bool> {
        known.iter().map(|k| k == candidate).collect()
    }
}

/// Reads back the speaker id the recorder wrote and scores 1.0 for the
/// same speaker, 0.0 otherwise.
pub struct IdVoices;

impl VoiceEmbeddingProvider for IdVoices {
    fn load_audio(&self, path: &Path) -> Result<Waveform, ModelError> {
        let bytes = std::fs::read(path).map_err(|e| ModelError::AudioLoad(e.to_string()))?;
        Ok(Waveform {
            samples: bytes.iter().map(|&b| b as f32).collect(),
            sample_rate: 16_000,
            channels: 1,
        })
    }

    fn embed(&self, waveform: &Waveform) -> Result<Embedding, ModelError> {
        if waveform.samples.is_empty() {
            return Err(ModelError::Embedding("empty recording".into()));
        }
        Ok(waveform.samples.clone())
    }

    fn similarity(&self, a: &Embedding, b: &Embedding) -> Result<f32, ModelError> {
        Ok(if a == b { 1.0 } else { 0.0 })
    }
}

/// Writes the configured speaker id as the "recording". When gated it
/// holds the microphone until released or cancelled.
pub struct ScriptedRecorder {
    speaker: u8,
    gate: Option<Arc<AtomicBool>>,
    fail: bool,
    recordings: Arc<Mutex<Vec<PathBuf>>>,
}

impl AudioRecorder for ScriptedRecorder {
    fn record(
        &self,
        path: &Path,
        spec: &RecordingSpec,
        cancel: &CancellationToken,
    ) -> Result<(), CaptureError> {
        if self.fail {
            return Err(CaptureError::MicrophoneUnavailable("no input device".into()));
        }
        self.recordings.lock().push(path.to_path_buf());

        if let Some(gate) = &self.gate {
            while !gate.load(Ordering::SeqCst) {
                if cancel.is_cancelled() {
                    return Err(CaptureError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        } else {
            std::thread::sleep(spec.duration);
        }

        std::fs::write(path, [self.speaker])?;
        Ok(())
    }
}

/// Catalogs held in memory.
pub struct StaticCatalogs {
    pub faces: EnrollmentCatalog,
    pub voices: VoiceTemplateCatalog,
}

impl CatalogStore for StaticCatalogs {
    fn load_face_catalog(&self) -> Result<EnrollmentCatalog, StorageError> {
        Ok(self.faces.clone())
    }

    fn load_voice_catalog(&self) -> Result<VoiceTemplateCatalog, StorageError> {
        Ok(self.voices.clone())
    }
}

/// Alice and Bob enrolled with face and voice.
pub fn enrolled_catalogs() -> StaticCatalogs {
    StaticCatalogs {
        faces: EnrollmentCatalog::new()
            .with_identity("Alice", vec![vec![ALICE as f32], vec![ALICE as f32]])
            .with_identity("Bob", vec![vec![BOB as f32]]),
        voices: VoiceTemplateCatalog::new()
            .with_identity("Alice", vec![vec![ALICE as f32]])
            .with_identity("Bob", vec![vec![BOB as f32]]),
    }
}

pub struct TestContextBuilder {
    config: Config,
    faces: Vec<u8>,
    speaker: u8,
    gated: bool,
    camera_fails: bool,
    microphone_fails: bool,
    catalogs: Option<Arc<dyn CatalogStore>>,
}

impl TestContextBuilder {
    pub fn faces(mut self, faces: &[u8]) -> Self {
        self.faces = faces.to_vec();
        self
    }

    pub fn speaker(mut self, speaker: u8) -> Self {
        self.speaker = speaker;
        self
    }

    /// Voice capture blocks until [`TestContext::release_microphone`].
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    pub fn camera_fails(mut self) -> Self {
        self.camera_fails = true;
        self
    }

    pub fn microphone_fails(mut self) -> Self {
        self.microphone_fails = true;
        self
    }

    pub fn catalogs(mut self, catalogs: Arc<dyn CatalogStore>) -> Self {
        self.catalogs = Some(catalogs);
        self
    }

    pub fn configure(mut self, edit: impl FnOnce(&mut Config)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn build(self) -> TestContext {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = self.config;
        config.voice.scratch_dir = Some(scratch.path().to_path_buf());

        let gate = Arc::new(AtomicBool::new(!self.gated));
        let recordings = Arc::new(Mutex::new(Vec::new()));
        let actuator = SimulatedActuator::new(&config.actuator);
        let movements = actuator.movement_counter();

        let collaborators = Collaborators {
            frame_source: Box::new(ScriptedCamera {
                faces: self.faces,
                ready: false,
                fail_start: self.camera_fails,
            }),
            face_provider: Arc::new(IdFaces),
            voice_provider: Arc::new(IdVoices),
            recorder: Arc::new(ScriptedRecorder {
                speaker: self.speaker,
                gate: self.gated.then(|| gate.clone()),
                fail: self.microphone_fails,
                recordings: recordings.clone(),
            }),
            catalogs: self
                .catalogs
                .unwrap_or_else(|| Arc::new(enrolled_catalogs())),
            actuator: Box::new(actuator),
        };

        TestContext {
            config,
            collaborators: Some(collaborators),
            movements,
            gate,
            recordings,
            scratch,
        }
    }
}

pub struct TestContext {
    pub config: Config,
    collaborators: Option<Collaborators>,
    pub movements: Arc<AtomicU64>,
    gate: Arc<AtomicBool>,
    recordings: Arc<Mutex<Vec<PathBuf>>>,
    scratch: TempDir,
}

impl TestContext {
    pub fn builder() -> TestContextBuilder {
        TestContextBuilder {
            config: Config::new_test_config(),
            faces: Vec::new(),
            speaker: STRANGER,
            gated: false,
            camera_fails: false,
            microphone_fails: false,
            catalogs: None,
        }
    }

    pub fn session(&mut self) -> DoorSession {
        let collaborators = self.collaborators.take().expect("session already built");
        DoorSession::new(Arc::new(self.config.clone()), collaborators)
            .expect("Failed to create door session")
    }

    pub fn take_collaborators(&mut self) -> Collaborators {
        self.collaborators.take().expect("collaborators already taken")
    }

    pub fn release_microphone(&self) {
        self.gate.store(true, Ordering::SeqCst);
    }

    pub fn movements(&self) -> u64 {
        self.movements.load(Ordering::SeqCst)
    }

    pub fn recordings(&self) -> Vec<PathBuf> {
        self.recordings.lock().clone()
    }

    /// Entries left behind in the voice scratch directory.
    pub fn scratch_leftovers(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

/// Waits until the session announces `phase`.
pub async fn wait_for_phase(events: &mut broadcast::Receiver<DoorEvent>, phase: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let DoorEvent::PhaseChanged { phase: current, .. } = events.recv().await.unwrap() {
                if current.name() == phase {
                    return;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {}", phase));
}

/// Drains events up to and including the verdict.
pub async fn collect_until_verdict(events: &mut broadcast::Receiver<DoorEvent>) -> Vec<DoorEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut seen = Vec::new();
        loop {
            let event = events.recv().await.unwrap();
            let done = matches!(event, DoorEvent::Verdict(_));
            seen.push(event);
            if done {
                return seen;
            }
        }
    })
    .await
    .expect("no verdict emitted")
}
