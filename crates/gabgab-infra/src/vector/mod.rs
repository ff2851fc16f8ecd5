//! Vector database infrastructure for recordings.
//!
//! Provides LanceDB connection management, the recordings table store and
//! fastembed-based local embedding generation. Arrow schemas define the
//! table structure.

pub mod embedder;
pub mod lance;
pub mod recordings;
pub mod schema;
