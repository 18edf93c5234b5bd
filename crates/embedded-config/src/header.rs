// Path: crates/embedded-config/src/header.rs
//! Wire constants of the embedded-configuration header.

/// Trailing magic identifying an embedded configuration.
pub const MAGIC: &[u8; 8] = b"hedgehog";

/// Header version this codec produces and accepts.
pub const HEADER_VERSION: u8 = 1;

/// Fixed size of the signature slot. An ECDSA P-256 DER signature is at most
/// 72 bytes; the slot is right-padded with zero bytes.
pub const SIGNATURE_LEN: usize = 73;

/// Size of the big-endian payload length field.
pub const SIZE_LEN: usize = 4;

/// Total header size appended after the payload:
/// `payload_size ∥ signature ∥ header_version ∥ magic`.
pub const HEADER_SIZE: usize = SIZE_LEN + SIGNATURE_LEN + 1 + MAGIC.len();
