// Path: crates/server/src/lib.rs
#![forbid(unsafe_code)]

//! Multi-listener server control for the seeder.
//!
//! A seeder process runs many HTTP engines at once: the generic insecure
//! listeners, the dynamically-discovered link-local listeners and the
//! mutually-authenticated secure listeners. This crate owns their shared
//! lifecycle ([`ServerSet`]), the reloadable TLS configuration
//! ([`TlsConfigHandle`]), the TLS accept loop that hands the verified peer
//! identity to the routers, and the link-local address discovery
//! ([`dynll`]).

pub mod control;
pub mod dynll;
pub mod listener;
pub mod timeouts;
pub mod tls;

pub use control::ServerSet;
pub use listener::{serve_plain, serve_tls};
pub use timeouts::HttpTimeouts;
pub use tls::TlsConfigHandle;

#[cfg(test)]
mod tests;
