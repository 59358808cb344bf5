// src/utils/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::plugins::traits::RecordingSpec;
use crate::utils::error::{DoorError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub face: FaceConfig,
    pub voice: VoiceConfig,
    pub storage: StorageConfig,
    pub actuator: ActuatorConfig,
    pub door: DoorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceConfig {
    pub window_ms: u64,
    pub poll_interval_ms: u64,
    pub warmup_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub similarity_threshold: f32,
    pub recording_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub face_catalog_path: PathBuf,
    pub voice_catalog_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorConfig {
    pub travel_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoorConfig {
    pub event_capacity: usize,
    /// Period of the background door status refresh; 0 disables it.
    pub status_poll_ms: u64,
}

impl Config {
    /// Loads defaults, `config/default`, `config/local`, `.env` and
    /// `DOORGUARD__*` environment overrides, in that order.
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();

        let builder = Self::with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. DOORGUARD__VOICE__SIMILARITY_THRESHOLD=0.2
            .add_source(
                Environment::with_prefix("DOORGUARD")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Loads defaults overlaid with a single configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = Self::with_defaults()?.add_source(File::from(path));
        Self::finish(builder)
    }

    /// Validated defaults with durations short enough for tests.
    pub fn new_test_config() -> Self {
        Self {
            node: NodeConfig {
                log_level: "debug".into(),
                log_dir: None,
            },
            face: FaceConfig {
                window_ms: 50,
                poll_interval_ms: 1,
                warmup_ms: 0,
            },
            voice: VoiceConfig {
                similarity_threshold: 0.10,
                recording_ms: 10,
                sample_rate: 16_000,
                channels: 1,
                scratch_dir: None,
            },
            storage: StorageConfig {
                face_catalog_path: PathBuf::from("data/encodings_faces.json"),
                voice_catalog_path: PathBuf::from("data/encodings_voices.json"),
            },
            actuator: ActuatorConfig { travel_ms: 0 },
            door: DoorConfig {
                event_capacity: 64,
                status_poll_ms: 0,
            },
        }
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = ConfigLib::builder()
            .set_default("node.log_level", "info")?
            .set_default("face.window_ms", 3000)?
            .set_default("face.poll_interval_ms", 10)?
            .set_default("face.warmup_ms", 2000)?
            .set_default("voice.similarity_threshold", 0.10)?
            .set_default("voice.recording_ms", 6000)?
            .set_default("voice.sample_rate", 44100)?
            .set_default("voice.channels", 2)?
            .set_default("storage.face_catalog_path", "data/encodings_faces.json")?
            .set_default("storage.voice_catalog_path", "data/encodings_voices.json")?
            .set_default("actuator.travel_ms", 1000)?
            .set_default("door.event_capacity", 64)?
            .set_default("door.status_poll_ms", 5000)?;
        Ok(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.face.window_ms == 0 {
            return Err(DoorError::Config("face.window_ms must be greater than 0".into()));
        }
        if self.voice.recording_ms == 0 {
            return Err(DoorError::Config("voice.recording_ms must be greater than 0".into()));
        }
        if self.voice.sample_rate == 0 {
            return Err(DoorError::Config("voice.sample_rate must be greater than 0".into()));
        }
        if self.voice.channels == 0 {
            return Err(DoorError::Config("voice.channels must be greater than 0".into()));
        }
        if !self.voice.similarity_threshold.is_finite() {
            return Err(DoorError::Config("voice.similarity_threshold must be finite".into()));
        }
        if self.door.event_capacity == 0 {
            return Err(DoorError::Config("door.event_capacity must be greater than 0".into()));
        }
        Ok(())
    }
}

impl FaceConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

impl VoiceConfig {
    pub fn recording_spec(&self) -> RecordingSpec {
        RecordingSpec {
            duration: Duration::from_millis(self.recording_ms),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

impl DoorConfig {
    pub fn status_poll_interval(&self) -> Option<Duration> {
        (self.status_poll_ms > 0).then(|| Duration::from_millis(self.status_poll_ms))
    }
}

impl ActuatorConfig {
    pub fn travel_time(&self) -> Duration {
        Duration::from_millis(self.travel_ms)
    }
}

impl From<ConfigError> for DoorError {
    fn from(error: ConfigError) -> Self {
        DoorError::Config(error.to_string())
    }
}
