//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding transcripts and queries into vectors
//! for semantic search. Implementations (fastembed ONNX models) live in
//! gabgab-infra; a deterministic hashing embedder lives next to this trait.

use gabgab_types::error::StoreError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations must be deterministic for a given input and model
/// version: recordings are embedded at insertion time and queries at search
/// time, and the two must land in the same space.
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors.
    ///
    /// Returns one vector per input text. Empty or whitespace-only text is
    /// rejected with [`StoreError::Embedding`].
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, StoreError>> + Send;

    /// The model name used for embeddings (e.g., "all-MiniLM-L6-v2").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Reject blank input before it reaches a model.
pub fn ensure_non_blank(texts: &[String]) -> Result<(), StoreError> {
    match texts.iter().position(|t| t.trim().is_empty()) {
        Some(i) => Err(StoreError::Embedding(format!(
            "text at position {i} is empty"
        ))),
        None => Ok(()),
    }
}
