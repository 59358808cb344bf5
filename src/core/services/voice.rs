// src/core/services/voice.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::identity::MatchResult;
use crate::plugins::traits::{AudioRecorder, RecordingSpec, VoiceEmbeddingProvider};
use crate::storage::VoiceTemplateCatalog;
use crate::utils::error::{CaptureError, ModelError};

/// A recorded voice sample living in its own scratch directory.
///
/// The directory, the recording and anything a provider writes next to it
/// are removed when the sample is discarded or dropped, whichever comes
/// first, on every path out of capture and matching.
pub struct VoiceSample {
    dir: Option<TempDir>,
    path: PathBuf,
    spec: RecordingSpec,
}

impl VoiceSample {
    pub const FILE_NAME: &'static str = "recorded_audio.wav";

    /// Records one sample into a fresh directory under `parent`, or under
    /// the system temp directory when `parent` is `None`.
    pub fn capture(
        recorder: &dyn AudioRecorder,
        spec: &RecordingSpec,
        parent: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<Self, CaptureError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("doorguard-voice-");
            builder
        };
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().join(Self::FILE_NAME);

        info!(
            duration_ms = spec.duration.as_millis() as u64,
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "Recording voice sample"
        );
        recorder.record(&path, spec, cancel)?;

        Ok(Self {
            dir: Some(dir),
            path,
            spec: *spec,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory providers may use for intermediate files.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(|dir| dir.path())
    }

    pub fn spec(&self) -> &RecordingSpec {
        &self.spec
    }

    pub fn discard(mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().display().to_string();
            if let Err(e) = dir.close() {
                warn!(error = %e, path = %location, "Failed to remove voice scratch directory");
            }
        }
    }
}

/// Finds the enrolled speaker closest to a recorded sample.
pub struct VoiceMatcher {
    provider: Arc<dyn VoiceEmbeddingProvider>,
}

impl VoiceMatcher {
    pub fn new(provider: Arc<dyn VoiceEmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Scores `sample` against every reference in `catalog`. Model failures
    /// come back as a failed match with `failure` set. The sample is
    /// discarded before this returns.
    pub fn match_sample(
        &self,
        sample: VoiceSample,
        catalog: &VoiceTemplateCatalog,
        threshold: f32,
    ) -> MatchResult {
        let result = if catalog.is_empty() {
            info!("No enrolled voices; nobody can be recognized");
            MatchResult::no_match(0.0, threshold)
        } else {
            match self.score(&sample, catalog, threshold) {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Voice model failure; treating as no match");
                    MatchResult::degraded(threshold, e.to_string())
                }
            }
        };

        sample.discard();

        if result.passed {
            info!(identity = %result.identity, score = result.score, threshold, "Voice matched");
        } else if result.failure.is_none() {
            info!(best_score = result.score, threshold, "Voice not recognized");
        }
        result
    }

    fn score(
        &self,
        sample: &VoiceSample,
        catalog: &VoiceTemplateCatalog,
        threshold: f32,
    ) -> Result<MatchResult, ModelError> {
        let waveform = self.provider.load_audio(sample.path())?;
        let probe = self.provider.embed(&waveform)?;

        let mut best: Option<(&str, f32)> = None;
        let mut highest = f32::NEG_INFINITY;

        for (name, references) in catalog.iter() {
            for reference in references {
                let score = self.provider.similarity(reference, &probe)?;
                if score > highest {
                    highest = score;
                }
                // strict on both sides: an equal later score never displaces
                // the first identity to reach it
                if score > threshold && best.map_or(true, |(_, top)| score > top) {
                    best = Some((name, score));
                }
            }
        }

        Ok(match best {
            Some((name, score)) => MatchResult::accepted(name, score, threshold),
            None if highest.is_finite() => MatchResult::no_match(highest, threshold),
            None => MatchResult::no_match(0.0, threshold),
        })
    }
}
