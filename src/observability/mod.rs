//! Observability subsystem: metrics exposition.
//!
//! Structured logging is `tracing`-based and initialized by the binary
//! entry point; this module owns the Prometheus side.

pub mod metrics;
