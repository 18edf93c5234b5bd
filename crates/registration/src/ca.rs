// Path: crates/registration/src/ca.rs
//! The in-process certificate authority.

use dasboot_types::RegistrationError;
use rcgen::{
    Certificate, CertificateParams, CertificateSigningRequestParams, ExtendedKeyUsagePurpose,
    KeyIdMethod, KeyPair, KeyUsagePurpose, SerialNumber,
};
use rustls_pki_types::CertificateSigningRequestDer;
use sha1::{Digest, Sha1};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::FromDer;

/// Client certificates are minted slightly in the past to absorb clock skew
/// between the seeder and a freshly-booted device.
const BACKDATE: Duration = Duration::minutes(5);

/// Client certificate lifetime.
const VALIDITY: Duration = Duration::days(360);

/// A CA key/cert pair that mints device client certificates from CSRs.
pub struct CaSigner {
    issuer: Certificate,
    issuer_key: KeyPair,
}

impl CaSigner {
    /// Loads the CA from PEM-encoded certificate and private key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, RegistrationError> {
        let issuer_key = KeyPair::from_pem(key_pem)
            .map_err(|e| RegistrationError::BackendPermanent(format!("CA key: {e}")))?;
        let params = CertificateParams::from_ca_cert_pem(cert_pem)
            .map_err(|e| RegistrationError::BackendPermanent(format!("CA certificate: {e}")))?;
        // Re-issuing the CA params with its own key yields an issuer whose
        // subject and key match the on-disk CA, which is all chain building
        // depends on.
        let issuer = params
            .self_signed(&issuer_key)
            .map_err(|e| RegistrationError::BackendPermanent(format!("CA certificate: {e}")))?;
        Ok(Self { issuer, issuer_key })
    }

    /// Builds a signer from an in-memory issuer, used by tests and by
    /// callers that generate an ephemeral CA.
    pub fn new(issuer: Certificate, issuer_key: KeyPair) -> Self {
        Self { issuer, issuer_key }
    }

    /// The issuer certificate, DER-encoded.
    pub fn issuer_der(&self) -> Vec<u8> {
        self.issuer.der().to_vec()
    }

    /// Issues a client certificate for `device_id` from its CSR.
    ///
    /// The CSR must be self-consistent (valid signature), carry a non-empty
    /// `CommonName` equal to the device id, and hold an ECDSA P-256 public
    /// key. The leaf copies the CSR subject, gets a random 63-bit serial, a
    /// SHA-1 subject key identifier, `DigitalSignature | KeyEncipherment`
    /// key usage and the `ClientAuth` extended usage.
    pub fn issue(&self, csr_der: &[u8], device_id: Uuid) -> Result<Vec<u8>, RegistrationError> {
        let spki_bytes = check_csr(csr_der, device_id)?;

        let ski = Sha1::digest(&spki_bytes).to_vec();

        let der = CertificateSigningRequestDer::from(csr_der.to_vec());
        let mut csr_params = CertificateSigningRequestParams::from_der(&der)
            .map_err(|e| RegistrationError::InvalidCsr(e.to_string()))?;

        let now = OffsetDateTime::now_utc();
        csr_params.params.serial_number = Some(SerialNumber::from(random_serial()));
        csr_params.params.not_before = now - BACKDATE;
        csr_params.params.not_after = now + VALIDITY;
        csr_params.params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        csr_params.params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        csr_params.params.key_identifier_method = KeyIdMethod::PreSpecified(ski);

        let cert = csr_params
            .signed_by(&self.issuer, &self.issuer_key)
            .map_err(|e| RegistrationError::BackendPermanent(format!("signing failed: {e}")))?;
        Ok(cert.der().to_vec())
    }
}

/// 63-bit positive serial.
fn random_serial() -> u64 {
    rand::random::<u64>() >> 1
}

/// Validates the CSR and returns the raw subject-public-key bytes.
fn check_csr(csr_der: &[u8], device_id: Uuid) -> Result<Vec<u8>, RegistrationError> {
    let (_, csr) = X509CertificationRequest::from_der(csr_der)
        .map_err(|e| RegistrationError::InvalidCsr(e.to_string()))?;
    csr.verify_signature()
        .map_err(|e| RegistrationError::InvalidCsr(format!("CSR signature invalid: {e}")))?;

    let info = &csr.certification_request_info;
    let cn = info
        .subject
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default();
    if cn.is_empty() {
        return Err(RegistrationError::InvalidCsr(
            "CSR subject has no CommonName".to_string(),
        ));
    }
    if cn != device_id.to_string() {
        return Err(RegistrationError::InvalidCsr(format!(
            "CSR CommonName '{cn}' does not equal device id '{device_id}'"
        )));
    }

    let spki = &info.subject_pki;
    p256::ecdsa::VerifyingKey::from_sec1_bytes(&spki.subject_public_key.data).map_err(|e| {
        RegistrationError::InvalidCsr(format!("CSR public key is not ECDSA P-256: {e}"))
    })?;

    Ok(spki.subject_public_key.data.to_vec())
}

/// Extracts the raw subject-public-key bytes from a PKCS#10 CSR.
pub(crate) fn csr_public_key(csr_der: &[u8]) -> Result<Vec<u8>, RegistrationError> {
    let (_, csr) = X509CertificationRequest::from_der(csr_der)
        .map_err(|e| RegistrationError::InvalidCsr(e.to_string()))?;
    Ok(csr
        .certification_request_info
        .subject_pki
        .subject_public_key
        .data
        .to_vec())
}

/// Extracts the raw subject-public-key bytes from a DER certificate.
pub(crate) fn cert_public_key(cert_der: &[u8]) -> Result<Vec<u8>, RegistrationError> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(cert_der)
        .map_err(|e| RegistrationError::BackendPermanent(format!("stored certificate: {e}")))?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}

/// Parse-checks a PKCS#10 CSR without any further requirements.
pub fn validate_csr(csr_der: &[u8]) -> Result<(), RegistrationError> {
    X509CertificationRequest::from_der(csr_der)
        .map(|_| ())
        .map_err(|e| RegistrationError::InvalidCsr(e.to_string()))
}
