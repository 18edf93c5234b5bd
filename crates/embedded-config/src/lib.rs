// Path: crates/embedded-config/src/lib.rs
#![forbid(unsafe_code)]

//! The embedded-configuration codec.
//!
//! Every installer the seeder serves carries a signed, versioned
//! configuration blob appended to the executable image:
//!
//! ```text
//! [ original executable ]
//! [ payload_json        ]   payload_size bytes
//! [ payload_size        ]   u32 big-endian (4 bytes)
//! [ signature           ]   73 bytes (ECDSA DER, right-zero-padded)
//! [ header_version      ]   u8 (value 1)
//! [ magic               ]   8 bytes = "hedgehog"
//! ```
//!
//! The signature covers everything up to and including `payload_size`, so
//! neither the executable, the configuration, nor its length can be altered
//! without detection. The magic sits at the tail so a reader can scan from
//! the end without touching the executable, and a plain-executable loader
//! can ignore the appendix entirely.

pub mod header;
pub mod read;
pub mod signer;
mod verify;

mod generate;

pub use generate::generate;
pub use header::{HEADER_SIZE, HEADER_VERSION, MAGIC, SIGNATURE_LEN};
pub use read::{read, ReadOptions};
pub use signer::ConfigSigner;

pub use dasboot_types::error::CodecError;
pub use dasboot_types::stage::ConfigRecord;

#[cfg(test)]
mod tests;
