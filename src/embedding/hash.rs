//! Offline feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! `dims` buckets with a sign taken from the digest, and the resulting
//! vector is L2-normalized. Texts sharing words land close together, which
//! is enough for development, CI, and tests without a network provider.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::error::KbResult;

pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dims;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> KbResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
