//! Shared domain types for GabGab.
//!
//! This crate contains the types used across the GabGab recording store:
//! recordings, search hits, column values, update predicates, configuration
//! and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, chrono, thiserror.

pub mod column;
pub mod config;
pub mod error;
pub mod predicate;
pub mod recording;
