//! BoxEmbedder -- object-safe dynamic dispatch wrapper for Embedder.
//!
//! 1. `EmbedderDyn` is the object-safe twin of `Embedder` with boxed futures
//! 2. Blanket-impl `EmbedderDyn` for all `T: Embedder`
//! 3. `BoxEmbedder` wraps `Box<dyn EmbedderDyn>` and is itself an `Embedder`,
//!    so the facade stays generic while the model is picked from config

use std::future::Future;
use std::pin::Pin;

use gabgab_types::error::StoreError;

use super::embedder::Embedder;

type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, StoreError>> + Send + 'a>>;

/// Object-safe version of [`Embedder`] with boxed futures.
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a>;

    fn model_name_dyn(&self) -> &str;

    fn dimension_dyn(&self) -> usize;
}

impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a> {
        Box::pin(self.embed(texts))
    }

    fn model_name_dyn(&self) -> &str {
        self.model_name()
    }

    fn dimension_dyn(&self) -> usize {
        self.dimension()
    }
}

/// Type-erased embedder selected at runtime (fastembed or hashing).
pub struct BoxEmbedder {
    inner: Box<dyn EmbedderDyn>,
}

impl BoxEmbedder {
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }
}

impl std::fmt::Debug for BoxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxEmbedder")
            .field("model", &self.inner.model_name_dyn())
            .field("dimension", &self.inner.dimension_dyn())
            .finish()
    }
}

impl Embedder for BoxEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        self.inner.embed_boxed(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name_dyn()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension_dyn()
    }
}
