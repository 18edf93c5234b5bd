// Path: crates/telemetry/src/lib.rs
#![forbid(unsafe_code)]

//! Observability infrastructure for the seeder: JSON logging bootstrap
//! with bring-up-tuned filter defaults, and a clamped-down `/metrics` +
//! `/healthz` listener for the operator network.

/// The internal metrics/healthz listener.
pub mod http;
/// The logging bootstrap for seeder processes.
pub mod init;
