// src/core/services/face.rs
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::identity::{Identity, IdentitySet};
use crate::plugins::traits::{FaceEmbeddingProvider, Frame, FrameSource};
use crate::storage::EnrollmentCatalog;
use crate::utils::config::FaceConfig;
use crate::utils::error::CaptureError;

/// What one face window produced.
#[derive(Debug, Clone, Default)]
pub struct ObservationReport {
    pub identities: IdentitySet,
    /// Recognized labels in the order they appeared, one per transition.
    pub sightings: Vec<String>,
    pub frames: u64,
    pub empty_polls: u64,
    pub elapsed: Duration,
}

impl ObservationReport {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Records a label only when it differs from the previously recognized one,
/// so a person standing in front of the camera counts once while a real
/// re-entry after someone else still counts. Unknown faces leave the cursor
/// untouched.
#[derive(Debug)]
pub struct RecognitionTracker {
    current: Identity,
    sightings: Vec<String>,
}

impl RecognitionTracker {
    pub fn new() -> Self {
        Self {
            current: Identity::Unknown,
            sightings: Vec::new(),
        }
    }

    /// Returns true when `label` opened a new sighting.
    pub fn record(&mut self, label: &Identity) -> bool {
        let name = match label {
            Identity::Known(name) => name,
            Identity::Unknown => return false,
        };
        if self.current.as_known() == Some(name.as_str()) {
            return false;
        }
        self.current = label.clone();
        self.sightings.push(name.clone());
        true
    }

    pub fn sightings(&self) -> &[String] {
        &self.sightings
    }

    pub fn identities(&self) -> IdentitySet {
        self.sightings.iter().cloned().collect()
    }
}

impl Default for RecognitionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Label of one face: the identity owning most matching reference
/// embeddings. On a tie the identity whose first matching reference comes
/// earliest in the catalog wins.
pub fn majority_vote(names: &[String], matches: &[bool]) -> Identity {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for (name, _) in names.iter().zip(matches).filter(|(_, matched)| **matched) {
        match tally.iter_mut().find(|(candidate, _)| *candidate == name.as_str()) {
            Some((_, count)) => *count += 1,
            None => tally.push((name.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((name, count));
        }
    }

    best.map(|(name, _)| Identity::known(name))
        .unwrap_or(Identity::Unknown)
}

pub struct FaceObservationAggregator {
    poll_interval: Duration,
    warmup: Duration,
}

impl FaceObservationAggregator {
    pub fn new(config: &FaceConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            warmup: config.warmup(),
        }
    }

    /// Watches `source` for `window` and returns every known identity that
    /// won a face's majority vote at least once. Blocks the calling thread.
    pub fn observe(
        &self,
        window: Duration,
        source: &mut dyn FrameSource,
        provider: &dyn FaceEmbeddingProvider,
        catalog: &EnrollmentCatalog,
        cancel: &CancellationToken,
    ) -> Result<ObservationReport, CaptureError> {
        if catalog.is_empty() {
            info!("No enrolled faces; nobody can be recognized");
            return Ok(ObservationReport::default());
        }

        source.start()?;
        let mut running = RunningSource { source };
        let result = self.watch(window, &mut *running.source, provider, catalog, cancel);
        drop(running);

        if let Ok(report) = &result {
            info!(
                identities = %report.identities,
                frames = report.frames,
                elapsed_ms = report.elapsed.as_millis() as u64,
                fps = report.fps(),
                "Face window closed"
            );
        }
        result
    }

    fn watch(
        &self,
        window: Duration,
        source: &mut dyn FrameSource,
        provider: &dyn FaceEmbeddingProvider,
        catalog: &EnrollmentCatalog,
        cancel: &CancellationToken,
    ) -> Result<ObservationReport, CaptureError> {
        pause(self.warmup, cancel)?;

        let mut tracker = RecognitionTracker::new();
        let mut frames = 0u64;
        let mut empty_polls = 0u64;
        let started = Instant::now();

        while started.elapsed() < window {
            if cancel.is_cancelled() {
                return Err(CaptureError::Cancelled);
            }

            let frame = match source.read() {
                Some(frame) => frame,
                None => {
                    empty_polls += 1;
                    std::thread::sleep(self.poll_interval);
                    continue;
                }
            };

            for label in self.label_faces(&frame, provider, catalog) {
                if tracker.record(&label) {
                    info!(identity = %label, "Recognized face");
                }
            }
            frames += 1;
        }

        Ok(ObservationReport {
            identities: tracker.identities(),
            sightings: tracker.sightings().to_vec(),
            frames,
            empty_polls,
            elapsed: started.elapsed(),
        })
    }

    /// One label per detected face, in detection order. A frame the model
    /// cannot process yields no labels.
    fn label_faces(
        &self,
        frame: &Frame,
        provider: &dyn FaceEmbeddingProvider,
        catalog: &EnrollmentCatalog,
    ) -> Vec<Identity> {
        let boxes = match provider.locate(frame) {
            Ok(boxes) if boxes.is_empty() => return Vec::new(),
            Ok(boxes) => boxes,
            Err(e) => {
                warn!(error = %e, "Face detection failed; skipping frame");
                return Vec::new();
            }
        };

        let encodings = match provider.encode(frame, &boxes) {
            Ok(encodings) => encodings,
            Err(e) => {
                warn!(error = %e, "Face encoding failed; skipping frame");
                return Vec::new();
            }
        };

        debug!(faces = encodings.len(), "Encoded faces");
        encodings
            .iter()
            .map(|encoding| {
                let flags = provider.compare_many(catalog.encodings(), encoding);
                majority_vote(catalog.names(), &flags)
            })
            .collect()
    }
}

/// Stops the camera when dropped, so an unwinding provider cannot leave it
/// running.
struct RunningSource<'a> {
    source: &'a mut dyn FrameSource,
}

impl Drop for RunningSource<'_> {
    fn drop(&mut self) {
        self.source.stop();
    }
}

/// Sleeps for `duration` in short slices, giving up as soon as `cancel` fires.
pub(crate) fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), CaptureError> {
    const SLICE: Duration = Duration::from_millis(20);
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}
