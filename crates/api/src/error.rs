// Path: crates/api/src/error.rs
// Re-export the canonical error types from the types crate.
pub use dasboot_types::error::{
    CodecError, ConfigError, ErrorCode, RegistrationError, ServerError,
};
