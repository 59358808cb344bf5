// src/storage/catalog.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::{Result, StorageError};
use crate::core::identity::Embedding;
use crate::utils::config::StorageConfig;

/// Enrolled face references as parallel lists: `names[i]` owns
/// `encodings[i]`. Order is enrollment order and decides vote ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentCatalog {
    names: Vec<String>,
    encodings: Vec<Embedding>,
}

impl EnrollmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, encoding: Embedding) {
        self.names.push(name.into());
        self.encodings.push(encoding);
    }

    pub fn with_identity(mut self, name: &str, encodings: Vec<Embedding>) -> Self {
        for encoding in encodings {
            self.push(name, encoding);
        }
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn encodings(&self) -> &[Embedding] {
        &self.encodings
    }

    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.names.len() != self.encodings.len() {
            return Err(StorageError::InvalidFormat(format!(
                "{} names for {} encodings",
                self.names.len(),
                self.encodings.len()
            )));
        }
        Ok(())
    }
}

/// Enrolled voice references, one entry per identity in enrollment order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceTemplateCatalog {
    entries: Vec<(String, Vec<Embedding>)>,
}

impl VoiceTemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends references; an identity enrolled twice keeps its first
    /// position.
    pub fn insert(&mut self, name: impl Into<String>, embeddings: Vec<Embedding>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, refs)) => refs.extend(embeddings),
            None => self.entries.push((name, embeddings)),
        }
    }

    pub fn with_identity(mut self, name: &str, embeddings: Vec<Embedding>) -> Self {
        self.insert(name, embeddings);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Embedding])> {
        self.entries
            .iter()
            .map(|(name, refs)| (name.as_str(), refs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait CatalogStore: Send + Sync {
    fn load_face_catalog(&self) -> Result<EnrollmentCatalog>;

    fn load_voice_catalog(&self) -> Result<VoiceTemplateCatalog>;
}

/// Catalogs kept as JSON files on local disk.
pub struct JsonCatalogStore {
    face_path: PathBuf,
    voice_path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            face_path: config.face_catalog_path.clone(),
            voice_path: config.voice_catalog_path.clone(),
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::IoError(e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl CatalogStore for JsonCatalogStore {
    fn load_face_catalog(&self) -> Result<EnrollmentCatalog> {
        let catalog: EnrollmentCatalog = Self::read_json(&self.face_path)?;
        catalog.validate()?;
        debug!(encodings = catalog.len(), path = %self.face_path.display(), "Loaded face catalog");
        Ok(catalog)
    }

    fn load_voice_catalog(&self) -> Result<VoiceTemplateCatalog> {
        let catalog: VoiceTemplateCatalog = Self::read_json(&self.voice_path)?;
        debug!(identities = catalog.len(), path = %self.voice_path.display(), "Loaded voice catalog");
        Ok(catalog)
    }
}

/// Missing or corrupt face data means nobody can be recognized, not a halt.
pub fn face_catalog_or_empty(store: &dyn CatalogStore) -> EnrollmentCatalog {
    store.load_face_catalog().unwrap_or_else(|e| {
        warn!(error = %e, "Face catalog unavailable; treating as empty");
        EnrollmentCatalog::new()
    })
}

pub fn voice_catalog_or_empty(store: &dyn CatalogStore) -> VoiceTemplateCatalog {
    store.load_voice_catalog().unwrap_or_else(|e| {
        warn!(error = %e, "Voice catalog unavailable; treating as empty");
        VoiceTemplateCatalog::new()
    })
}
