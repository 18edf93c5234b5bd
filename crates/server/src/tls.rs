// Path: crates/server/src/tls.rs
//! Reloadable TLS server configuration.

use dasboot_types::ConfigError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::sync::{Arc, RwLock};

/// A swap-on-reload handle around an `Arc<rustls::ServerConfig>`.
///
/// The handshake path takes the read lock only long enough to clone the
/// current `Arc`; an in-flight handshake keeps using the snapshot it
/// captured before a reload.
pub struct TlsConfigHandle {
    inner: RwLock<Arc<ServerConfig>>,
}

impl TlsConfigHandle {
    /// Builds the initial configuration from PEM material.
    pub fn new(
        key_pem: &[u8],
        cert_pem: &[u8],
        client_ca_pem: Option<&[u8]>,
    ) -> Result<Self, ConfigError> {
        let config = build_server_config(key_pem, cert_pem, client_ca_pem)?;
        Ok(Self {
            inner: RwLock::new(Arc::new(config)),
        })
    }

    /// The current configuration snapshot.
    pub fn snapshot(&self) -> Arc<ServerConfig> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Parses new key/cert material and swaps it in. Connections accepted
    /// after the swap use the new configuration; failures leave the old
    /// configuration in place.
    pub fn reload(
        &self,
        key_pem: &[u8],
        cert_pem: &[u8],
        client_ca_pem: Option<&[u8]>,
    ) -> Result<(), ConfigError> {
        let config = Arc::new(build_server_config(key_pem, cert_pem, client_ca_pem)?);
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
        Ok(())
    }
}

/// TLS 1.2 minimum; client certificates are verified when presented but not
/// required (devices only hold one from stage2 onward).
fn build_server_config(
    key_pem: &[u8],
    cert_pem: &[u8],
    client_ca_pem: Option<&[u8]>,
) -> Result<ServerConfig, ConfigError> {
    let certs = parse_certs(cert_pem)?;
    if certs.is_empty() {
        return Err(ConfigError::NoCertsAdded("server certificate".to_string()));
    }
    let key = parse_key(key_pem)?;

    let verifier = match client_ca_pem {
        Some(pem) => {
            let mut roots = RootCertStore::empty();
            for cert in parse_certs(pem)? {
                roots.add(cert).map_err(|e| ConfigError::KeyPair {
                    path: "client CA pool".to_string(),
                    reason: e.to_string(),
                })?;
            }
            if roots.is_empty() {
                return Err(ConfigError::NoCertsAdded("client CA pool".to_string()));
            }
            WebPkiClientVerifier::builder(Arc::new(roots))
                .allow_unauthenticated()
                .build()
                .map_err(|e| ConfigError::KeyPair {
                    path: "client CA pool".to_string(),
                    reason: e.to_string(),
                })?
        }
        None => WebPkiClientVerifier::no_client_auth(),
    };

    let mut config = ServerConfig::builder_with_protocol_versions(&[
        &rustls::version::TLS13,
        &rustls::version::TLS12,
    ])
    .with_client_cert_verifier(verifier)
    .with_single_cert(certs, key)
    .map_err(|e| ConfigError::KeyPair {
        path: "server key/cert".to_string(),
        reason: e.to_string(),
    })?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

fn parse_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    rustls_pemfile::certs(&mut std::io::Cursor::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::KeyPair {
            path: "certificate PEM".to_string(),
            reason: e.to_string(),
        })
}

fn parse_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, ConfigError> {
    rustls_pemfile::private_key(&mut std::io::Cursor::new(pem))
        .map_err(|e| ConfigError::KeyPair {
            path: "private key PEM".to_string(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| ConfigError::KeyPair {
            path: "private key PEM".to_string(),
            reason: "no private key found".to_string(),
        })
}
