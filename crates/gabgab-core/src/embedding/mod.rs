//! Text embedding: the `Embedder` port, its type-erased wrapper and a
//! deterministic hashing implementation.

pub mod box_embedder;
pub mod embedder;
pub mod hashing;

pub use box_embedder::BoxEmbedder;
pub use embedder::Embedder;
pub use hashing::HashingEmbedder;
