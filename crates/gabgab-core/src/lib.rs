//! Business logic and port trait definitions for GabGab.
//!
//! This crate defines the "ports" that the infrastructure layer implements
//! (`Embedder`, `RecordingStore`) and the `RecordingService` facade that
//! sequences them. It depends only on `gabgab-types` -- never on
//! `gabgab-infra` or any database/model crate.

pub mod embedding;
pub mod service;
pub mod store;
