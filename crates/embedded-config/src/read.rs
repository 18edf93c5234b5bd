// Path: crates/embedded-config/src/read.rs
//! Extracting and verifying an embedded configuration.

use crate::header::{HEADER_SIZE, HEADER_VERSION, MAGIC, SIZE_LEN};
use crate::verify;
use dasboot_types::error::CodecError;
use dasboot_types::stage::ConfigRecord;

/// Knobs for [`read`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Skip certificate-chain and signature verification entirely.
    pub ignore_signature: bool,
    /// If chain verification fails only because the signer certificate is
    /// expired, retry with `not_before + 1s` as the reference time. The
    /// earliest installer stage runs before the device clock is trustworthy.
    pub ignore_expiry: bool,
}

/// Reads the embedded configuration out of `input`, verifying the signer
/// certificate against the `trust` pool (DER CA certificates) and the
/// signature over the executable, payload and length field.
pub fn read<R: ConfigRecord>(
    input: &[u8],
    trust: &[Vec<u8>],
    opts: ReadOptions,
) -> Result<R, CodecError> {
    if input.len() < MAGIC.len() || &input[input.len() - MAGIC.len()..] != MAGIC {
        return Err(CodecError::ConfigNotPresent);
    }
    if input.len() <= HEADER_SIZE {
        return Err(CodecError::ExeTooSmall(format!(
            "{} bytes leave no room for an executable before the header",
            input.len()
        )));
    }

    let version_byte = input[input.len() - MAGIC.len() - 1];
    if version_byte != HEADER_VERSION {
        return Err(CodecError::UnsupportedHeaderVersion(version_byte));
    }

    // `header_start` is the offset of the payload_size field; everything
    // before it is executable plus payload.
    let header_start = input.len() - HEADER_SIZE;
    let size_bytes: [u8; SIZE_LEN] = input[header_start..header_start + SIZE_LEN]
        .try_into()
        .map_err(|_| CodecError::ExeTooSmall("truncated payload_size".to_string()))?;
    let payload_size = u32::from_be_bytes(size_bytes) as usize;
    if payload_size > header_start {
        return Err(CodecError::ExeTooSmall(format!(
            "payload of {payload_size} bytes does not fit in {header_start} bytes of input"
        )));
    }

    let payload = &input[header_start - payload_size..header_start];
    // A zero-length payload decodes as the empty object; the record's own
    // validation decides whether that is acceptable.
    let record: R = if payload.is_empty() {
        serde_json::from_slice(b"{}")?
    } else {
        serde_json::from_slice(payload)?
    };

    let version = record.version();
    if version < 1 {
        return Err(CodecError::InvalidConfigVersion(version));
    }
    if !record.supported_versions(version) {
        return Err(CodecError::UnsupportedConfigVersion(version));
    }

    if !opts.ignore_signature {
        verify::verify_envelope(input, header_start, record.signature_cert(), trust, opts)?;
    }

    record.validate()?;
    Ok(record)
}
