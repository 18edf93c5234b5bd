// Path: crates/embedded-config/src/signer.rs
//! Signing identity for embedded configurations.

use dasboot_types::error::CodecError;
use p256::ecdsa::SigningKey;
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

/// An ECDSA P-256 signing key together with the DER certificate that will be
/// embedded as `signature_cert` in every record it signs.
#[derive(Clone)]
pub struct ConfigSigner {
    key: SigningKey,
    cert_der: Vec<u8>,
}

impl ConfigSigner {
    /// Builds a signer from an already-parsed key and certificate.
    pub fn new(key: SigningKey, cert_der: Vec<u8>) -> Result<Self, CodecError> {
        ensure_ecdsa_cert(&cert_der)?;
        Ok(Self { key, cert_der })
    }

    /// Builds a signer from PEM-encoded key and certificate material.
    ///
    /// The key must be an ECDSA key on curve P-256, in either PKCS#8
    /// (`PRIVATE KEY`) or SEC1 (`EC PRIVATE KEY`) form; anything else,
    /// including ECDSA keys on other curves, is rejected with
    /// [`CodecError::InvalidKey`].
    pub fn from_pem(key_pem: &str, cert_pem: &str) -> Result<Self, CodecError> {
        let secret = if key_pem.contains("EC PRIVATE KEY") {
            SecretKey::from_sec1_pem(key_pem)
                .map_err(|e| CodecError::InvalidKey(format!("not a P-256 SEC1 key: {e}")))?
        } else {
            SecretKey::from_pkcs8_pem(key_pem)
                .map_err(|e| CodecError::InvalidKey(format!("not a P-256 PKCS#8 key: {e}")))?
        };
        let cert_der = pem_to_der(cert_pem)?;
        Self::new(SigningKey::from(secret), cert_der)
    }

    /// The signing key.
    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// The signer certificate, DER-encoded.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }
}

fn pem_to_der(cert_pem: &str) -> Result<Vec<u8>, CodecError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| CodecError::InvalidKey(format!("cannot parse certificate PEM: {e}")))?;
    Ok(pem.contents)
}

fn ensure_ecdsa_cert(cert_der: &[u8]) -> Result<(), CodecError> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(cert_der)
        .map_err(|e| CodecError::InvalidKey(format!("cannot parse signer certificate: {e}")))?;
    ensure_p256_spki(cert.public_key())
        .map_err(|e| CodecError::InvalidKey(format!("signer certificate: {e}")))?;
    Ok(())
}

/// Checks that an SPKI carries an ECDSA P-256 public key and returns the
/// parsed verifying key.
pub(crate) fn ensure_p256_spki(
    spki: &SubjectPublicKeyInfo<'_>,
) -> Result<p256::ecdsa::VerifyingKey, String> {
    use x509_parser::oid_registry::OID_KEY_TYPE_EC_PUBLIC_KEY;

    if spki.algorithm.algorithm != OID_KEY_TYPE_EC_PUBLIC_KEY {
        return Err(format!(
            "public key algorithm {} is not id-ecPublicKey",
            spki.algorithm.algorithm
        ));
    }
    p256::ecdsa::VerifyingKey::from_sec1_bytes(&spki.subject_public_key.data)
        .map_err(|e| format!("not a P-256 public key: {e}"))
}

/// Loads PEM text from disk and drops the signer's key material out of any
/// error message.
pub fn load_pem(path: &std::path::Path) -> Result<String, CodecError> {
    std::fs::read_to_string(path)
        .map_err(|e| CodecError::InvalidKey(format!("cannot read {}: {e}", path.display())))
}

/// Parses every certificate in a PEM bundle into DER blocks.
pub fn pem_bundle_to_der(bundle: &str) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut out = Vec::new();
    for pem in Pem::iter_from_buffer(bundle.as_bytes()) {
        let pem = pem
            .map_err(|e| CodecError::InvalidKey(format!("cannot parse PEM bundle: {e}")))?;
        if pem.label == "CERTIFICATE" {
            out.push(pem.contents);
        }
    }
    Ok(out)
}
