// Path: crates/embedded-config/src/verify.rs
//! Certificate-chain and envelope-signature verification.

use crate::header::{SIGNATURE_LEN, SIZE_LEN};
use crate::read::ReadOptions;
use crate::signer::ensure_p256_spki;
use dasboot_types::error::CodecError;
use p256::ecdsa::signature::DigestVerifier;
use p256::ecdsa::Signature;
use sha2::{Digest, Sha256};
use time::Duration;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

/// Verifies that `cert_der` chains to one of the `trust` CA certificates and
/// that the envelope signature matches the checksum over
/// `input[..header_start + 4]`.
pub(crate) fn verify_envelope(
    input: &[u8],
    header_start: usize,
    cert_der: &[u8],
    trust: &[Vec<u8>],
    opts: ReadOptions,
) -> Result<(), CodecError> {
    let (_, cert) = X509Certificate::from_der(cert_der).map_err(|e| {
        CodecError::SignatureVerificationFailure(format!("cannot parse signer certificate: {e}"))
    })?;

    chain_to_pool(&cert, trust, opts)?;

    let verifying_key =
        ensure_p256_spki(cert.public_key()).map_err(CodecError::UnsupportedSignatureKeyType)?;

    // The signed range covers the executable, the payload and the length
    // field; the signature slot itself is excluded.
    let digest = Sha256::new_with_prefix(&input[..header_start + SIZE_LEN]);

    let slot = &input[header_start + SIZE_LEN..header_start + SIZE_LEN + SIGNATURE_LEN];
    // A DER ECDSA signature ends in a length-prefixed INTEGER and never in a
    // zero byte, so stripping the slot padding cannot eat signature bytes.
    let mut sig_len = slot.len();
    while sig_len > 0 && slot[sig_len - 1] == 0 {
        sig_len -= 1;
    }
    let signature = Signature::from_der(&slot[..sig_len]).map_err(|e| {
        CodecError::SignatureVerificationFailure(format!("malformed DER signature: {e}"))
    })?;

    verifying_key.verify_digest(digest, &signature).map_err(|_| {
        CodecError::SignatureVerificationFailure(
            "signature does not match executable and payload".to_string(),
        )
    })
}

/// Checks issuer/signature chaining of `cert` against the trust pool, then
/// its validity window at the current time, or at `not_before + 1s` when
/// `ignore_expiry` is set.
fn chain_to_pool(
    cert: &X509Certificate<'_>,
    trust: &[Vec<u8>],
    opts: ReadOptions,
) -> Result<(), CodecError> {
    let mut chained = false;
    for ca_der in trust {
        let Ok((_, ca)) = X509Certificate::from_der(ca_der) else {
            continue;
        };
        if ca.subject() != cert.issuer() {
            continue;
        }
        if cert.verify_signature(Some(ca.public_key())).is_ok() {
            chained = true;
            break;
        }
    }
    if !chained {
        return Err(CodecError::SignatureVerificationFailure(
            "signer certificate does not chain to a trusted CA".to_string(),
        ));
    }

    let not_before = cert.validity().not_before.to_datetime();
    let not_after = cert.validity().not_after.to_datetime();
    let now = time::OffsetDateTime::now_utc();
    if now >= not_before && now <= not_after {
        return Ok(());
    }
    if opts.ignore_expiry {
        let reference = not_before + Duration::seconds(1);
        if reference >= not_before && reference <= not_after {
            return Ok(());
        }
    }
    Err(CodecError::SignatureVerificationFailure(format!(
        "signer certificate not valid at the current time (not_before {not_before}, not_after {not_after})"
    )))
}
