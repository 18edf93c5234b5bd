// Path: crates/api/src/identity.rs
//! Per-connection identity handed from the listeners to the HTTP handlers
//! as request extensions.

use std::net::SocketAddr;

/// The verified TLS client identity of a connection.
///
/// Inserted by the secure listener only when the peer presented a
/// certificate that chained to the configured pool; its absence means the
/// connection is TLS-anonymous (or plain HTTP).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// `Subject.CommonName` of the verified peer certificate. May be empty
    /// when the certificate carries no CN.
    pub common_name: String,
}

/// Remote socket address of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

/// Scheme the connection was served over, for building self-referential
/// URLs in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnScheme {
    /// Plain HTTP.
    Http,
    /// TLS.
    Https,
}

impl ConnScheme {
    /// URL scheme string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnScheme::Http => "http",
            ConnScheme::Https => "https",
        }
    }
}
