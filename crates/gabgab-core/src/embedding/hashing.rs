//! Deterministic feature-hashing embedder.
//!
//! Each lowercase word is padded as `^word$` and split into character
//! trigrams; every trigram is hashed (SHA-256, first 8 bytes) into one of
//! 384 buckets and counted. The count vector is L2-normalized. Texts that
//! share word fragments ("lights" / "lighting") land close together, which
//! is enough for offline use and for tests. It is not a semantic model.

use sha2::{Digest, Sha256};

use gabgab_types::error::StoreError;
use gabgab_types::recording::EMBEDDING_DIMENSION;

use super::embedder::{ensure_non_blank, Embedder};

const NGRAM: usize = 3;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashingEmbedder {
    /// Create a 384-dimensional hashing embedder.
    pub fn new() -> Self {
        Self::with_dimension(EMBEDDING_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("hashing-trigram-d{dimension}"),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }

    /// Embed a single text. Same text, same vector, on every platform.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let padded: Vec<char> = format!("^{}$", word.to_lowercase()).chars().collect();
            for gram in padded.windows(NGRAM) {
                let feature: String = gram.iter().collect();
                vector[self.bucket(&feature)] += 1.0;
            }
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        ensure_non_blank(texts)?;
        texts
            .iter()
            .map(|text| {
                let vector = self.embed_text(text);
                if vector.iter().all(|v| *v == 0.0) {
                    return Err(StoreError::Embedding(format!(
                        "text has no alphanumeric content to embed: '{text}'"
                    )));
                }
                Ok(vector)
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
