//! Observability setup for GabGab: structured logging via `tracing` with an
//! optional OpenTelemetry span exporter.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, shutdown_tracing, LogFormat, TracingOptions};
