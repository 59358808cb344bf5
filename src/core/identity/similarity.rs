// src/core/identity/similarity.rs
//! Distance and similarity primitives for embedding providers.
//!
//! Face embeddings are compared by euclidean distance against a tolerance
//! (lower is closer); speaker embeddings by cosine similarity (higher is
//! closer).

use crate::utils::error::ModelError;

/// Euclidean tolerance commonly used for 128-d face embeddings.
pub const DEFAULT_FACE_TOLERANCE: f32 = 0.6;

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, ModelError> {
    check_dimensions(a, b)?;
    let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum.sqrt())
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ModelError> {
    check_dimensions(a, b)?;
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

/// One flag per known embedding: true when within `tolerance` of `candidate`.
/// Embeddings of a different dimension never match.
pub fn compare_faces(known: &[Vec<f32>], candidate: &[f32], tolerance: f32) -> Vec<bool> {
    known
        .iter()
        .map(|reference| {
            euclidean_distance(reference, candidate)
                .map(|distance| distance <= tolerance)
                .unwrap_or(false)
        })
        .collect()
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<(), ModelError> {
    if a.len() != b.len() {
        return Err(ModelError::Similarity(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}
