//! Voice embeddings
//!
//! Deterministically maps an [`MfccProfile`] into a fixed 128-dimensional
//! unit-norm vector. The layout is fixed so that embeddings produced by
//! different processes remain comparable; only the all-zero silence
//! degenerate escapes L2 normalization.

use crate::error::VoiceError;
use crate::features::profile::MfccProfile;
use serde::{Deserialize, Serialize};

/// Embedding dimensionality; loads of any other length are rejected
pub const EMBEDDING_DIM: usize = 128;

/// Fixed-length voice embedding, compared via cosine similarity
///
/// Immutable once created. Deserialization goes through [`Embedding::from_vec`]
/// so a persisted vector of the wrong length is rejected, never truncated or
/// padded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl TryFrom<Vec<f32>> for Embedding {
    type Error = VoiceError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Embedding::from_vec(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0
    }
}

impl Embedding {
    /// Construct from a raw vector, rejecting any length other than 128
    pub fn from_vec(values: Vec<f32>) -> Result<Self, VoiceError> {
        if values.len() != EMBEDDING_DIM {
            return Err(VoiceError::InvalidInput(format!(
                "Embedding must have {} elements, got {}",
                EMBEDDING_DIM,
                values.len()
            )));
        }
        Ok(Self(values))
    }

    /// Generate the embedding for a profile
    ///
    /// Layout, in order: 13 coefficient means, 13 coefficient stds,
    /// pitch mean / 400, pitch std / 100, energy mean, energy std,
    /// centroid / 4000, zcr, 13 delta terms (means x 0.5), 13 delta-delta
    /// terms (stds x 0.3), 12 adjacent-coefficient cross-products (/ 1000),
    /// pitch x energy mean interaction (/ 100), pitch x energy std
    /// interaction (/ 10), centroid x pitch interaction (/ 100000), then
    /// zero-padding to 128. The result is L2-normalized unless its magnitude
    /// is zero (silence profile), in which case it stays all zeros.
    pub fn from_profile(profile: &MfccProfile) -> Self {
        let mut v = Vec::with_capacity(EMBEDDING_DIM);

        v.extend_from_slice(&profile.mfcc_means);
        v.extend_from_slice(&profile.mfcc_stds);

        v.push(profile.pitch_mean / 400.0);
        v.push(profile.pitch_std / 100.0);
        v.push(profile.energy_mean);
        v.push(profile.energy_std);
        v.push(profile.centroid_mean / 4000.0);
        v.push(profile.zcr);

        // Delta and delta-delta proxies scale the base statistics
        v.extend(profile.mfcc_means.iter().map(|&m| m * 0.5));
        v.extend(profile.mfcc_stds.iter().map(|&s| s * 0.3));

        // Adjacent-coefficient cross terms
        v.extend(
            profile
                .mfcc_means
                .windows(2)
                .map(|pair| pair[0] * pair[1] / 1000.0),
        );

        v.push(profile.pitch_mean * profile.energy_mean / 100.0);
        v.push(profile.pitch_std * profile.energy_std / 10.0);
        v.push(profile.centroid_mean * profile.pitch_mean / 100_000.0);

        v.resize(EMBEDDING_DIM, 0.0);

        let mut embedding = Self(v);
        embedding.normalize();
        embedding
    }

    /// Values as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|&x| x * x).sum::<f32>().sqrt()
    }

    /// Whether every element is exactly zero (the silence degenerate)
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0.0)
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for x in &mut self.0 {
                *x /= norm;
            }
        }
    }

    /// Cosine similarity with another embedding
    ///
    /// Symmetric; returns 0.0 if either vector has zero magnitude.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        let dot: f32 = self.0.iter().zip(&other.0).map(|(&a, &b)| a * b).sum();
        let denom = self.norm() * other.norm();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Merge several embeddings by vector sum followed by renormalization
    ///
    /// This is the defined algorithm for combining multiple samples of one
    /// speaker, used both by initial enrollment and by session speakers. It is
    /// order-insensitive up to floating-point error.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` for an empty slice.
    pub fn merge_sum(embeddings: &[Embedding]) -> Result<Embedding, VoiceError> {
        if embeddings.is_empty() {
            return Err(VoiceError::InvalidInput(
                "Cannot merge an empty set of embeddings".to_string(),
            ));
        }
        let mut sum = vec![0.0f32; EMBEDDING_DIM];
        for e in embeddings {
            for (acc, &x) in sum.iter_mut().zip(&e.0) {
                *acc += x;
            }
        }
        let mut merged = Self(sum);
        merged.normalize();
        Ok(merged)
    }

    /// Weighted incremental merge: `new = old * w + sample * (1 - w)` with
    /// `w = sample_count / (sample_count + 1)`, then renormalize
    ///
    /// Confidence in the existing embedding grows with `sample_count` and
    /// never decays.
    pub fn merge_weighted(&self, sample: &Embedding, sample_count: u32) -> Embedding {
        let w = sample_count as f32 / (sample_count as f32 + 1.0);
        let blended: Vec<f32> = self
            .0
            .iter()
            .zip(&sample.0)
            .map(|(&old, &new)| old * w + new * (1.0 - w))
            .collect();
        let mut merged = Self(blended);
        merged.normalize();
        merged
    }
}
