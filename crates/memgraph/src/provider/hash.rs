//! Deterministic built-in embedding and similarity
//!
//! `HashEmbedder` maps each distinct token to a signed bucket of a fixed
//! size vector (feature hashing) and L2-normalizes the result, so texts
//! sharing vocabulary land close together under cosine similarity.
//! Buckets come from SHA-256, so vectors stay identical across builds and
//! platforms.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::provider::{Embedder, ProviderError, Similarity};
use crate::text::index_tokens;

/// Feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous embedding, shared by the trait impl and tests
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in index_tokens(text) {
            let hash = token_hash(&token);

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

/// First eight bytes of the token's SHA-256 digest, little-endian
fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

/// Cosine similarity in `[-1.0, 1.0]`; zero vectors score `0.0`
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine similarity collaborator. Mismatched dimensions are an error
/// rather than a silent zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl Similarity for CosineSimilarity {
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32, ProviderError> {
        if a.len() != b.len() {
            return Err(ProviderError::Similarity(format!(
                "dimension mismatch: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        Ok(cosine_similarity(a, b))
    }
}
