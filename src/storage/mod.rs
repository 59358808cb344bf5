// src/storage/mod.rs
pub mod catalog;
pub mod errors;

pub use catalog::{
    face_catalog_or_empty, voice_catalog_or_empty, CatalogStore, EnrollmentCatalog,
    JsonCatalogStore, VoiceTemplateCatalog,
};
pub use errors::StorageError;

#[cfg(test)]
pub use catalog::MockCatalogStore;
