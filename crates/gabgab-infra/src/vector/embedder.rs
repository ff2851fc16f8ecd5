//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `gabgab-core` with fastembed's ONNX
//! sentence-embedding models (all-MiniLM-L6-v2 or bge-small-en-v1.5, both
//! 384 dimensions). Inference is CPU-bound, so it runs on tokio's blocking
//! pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use gabgab_core::embedding::Embedder;
use gabgab_core::embedding::embedder::ensure_non_blank;
use gabgab_types::config::EmbedderConfig;
use gabgab_types::error::StoreError;
use gabgab_types::recording::EMBEDDING_DIMENSION;

/// Map a configured model name to a supported fastembed model.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel, StoreError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(StoreError::Initialization(format!(
            "unsupported embedding model '{other}' (expected all-MiniLM-L6-v2 or bge-small-en-v1.5)"
        ))),
    }
}

/// Local sentence-embedding model.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

impl FastEmbedder {
    /// Load the model named in `config`, downloading it on first use.
    pub fn new(config: &EmbedderConfig, default_cache_dir: PathBuf) -> Result<Self, StoreError> {
        let model = resolve_model(&config.model)?;
        let cache_dir = config.cache_dir.clone().unwrap_or(default_cache_dir);

        tracing::info!(
            model = %config.model,
            cache_dir = %cache_dir.display(),
            "Loading embedding model"
        );

        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(config.show_download_progress);
        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            StoreError::Initialization(format!("failed to load embedding model '{}': {e}", config.model))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(embedding)),
            model_name: config.model.clone(),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        ensure_non_blank(texts)?;

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| StoreError::Embedding("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| StoreError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Embedding(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}
