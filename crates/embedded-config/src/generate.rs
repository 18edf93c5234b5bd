// Path: crates/embedded-config/src/generate.rs
//! Building an executable-with-embedded-configuration.

use crate::header::{HEADER_SIZE, HEADER_VERSION, MAGIC, SIGNATURE_LEN};
use crate::signer::ConfigSigner;
use dasboot_types::error::CodecError;
use dasboot_types::stage::ConfigRecord;
use p256::ecdsa::signature::DigestSigner;
use p256::ecdsa::Signature;
use sha2::{Digest, Sha256};

/// Appends `record`, signed by `signer`, to `exe`.
///
/// The signer certificate is installed into the record before serialization
/// so that a reader can verify provenance from the envelope alone. The
/// checksum covers `exe ∥ payload ∥ payload_size`; re-lengthening the
/// payload therefore invalidates the signature.
pub fn generate<R: ConfigRecord>(
    exe: &[u8],
    record: &R,
    signer: &ConfigSigner,
) -> Result<Vec<u8>, CodecError> {
    if record.version() < 1 {
        return Err(CodecError::InvalidConfigVersion(record.version()));
    }

    let mut record = record.clone();
    record.set_signature_cert(signer.cert_der().to_vec());
    record.validate()?;

    let payload = serde_json::to_vec(&record)?;
    let payload_size: u32 = payload
        .len()
        .try_into()
        .map_err(|_| CodecError::ConfigTooLarge)?;

    let mut out = Vec::with_capacity(exe.len() + payload.len() + HEADER_SIZE);
    out.extend_from_slice(exe);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&payload_size.to_be_bytes());

    let digest = Sha256::new_with_prefix(&out);
    let signature: Signature = signer.key().sign_digest(digest);
    let der = signature.to_der();
    let der_bytes = der.as_bytes();
    if der_bytes.len() > SIGNATURE_LEN {
        return Err(CodecError::SignatureTooLarge(der_bytes.len()));
    }

    // Fixed-size slot: DER signature, right-padded with zero bytes.
    let mut slot = [0u8; SIGNATURE_LEN];
    slot[..der_bytes.len()].copy_from_slice(der_bytes);
    out.extend_from_slice(&slot);
    out.push(HEADER_VERSION);
    out.extend_from_slice(MAGIC);
    Ok(out)
}
