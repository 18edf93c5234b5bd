// Path: crates/types/src/error.rs
//! Error types for the DAS BOOT seeder.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors produced by the embedded-configuration codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The signing key is not an ECDSA key on curve P-256.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
    /// The serialized configuration payload does not fit a u32 length field.
    #[error("Configuration payload exceeds maximum size")]
    ConfigTooLarge,
    /// The DER signature exceeds the fixed 73-byte header slot.
    #[error("Signature length {0} exceeds the 73-byte header slot")]
    SignatureTooLarge(usize),
    /// The configuration record failed its own validation.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
    /// The input is too small to carry the requested structure.
    #[error("Executable too small: {0}")]
    ExeTooSmall(String),
    /// The trailing magic is absent; no embedded configuration present.
    #[error("No embedded configuration present")]
    ConfigNotPresent,
    /// The header version byte is not a version this reader understands.
    #[error("Unsupported header version {0}")]
    UnsupportedHeaderVersion(u8),
    /// The configuration carries a version below the minimum.
    #[error("Invalid configuration version {0}")]
    InvalidConfigVersion(i64),
    /// The configuration version is not supported by the record type.
    #[error("Unsupported configuration version {0}")]
    UnsupportedConfigVersion(i64),
    /// The signing certificate does not carry an ECDSA P-256 public key.
    #[error("Unsupported signature key type: {0}")]
    UnsupportedSignatureKeyType(String),
    /// Signature or certificate-chain verification failed.
    #[error("Signature verification failure: {0}")]
    SignatureVerificationFailure(String),
    /// JSON (de)serialization of the payload failed.
    #[error("Payload encoding failure: {0}")]
    EncodingFailure(#[from] serde_json::Error),
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "CODEC_INVALID_KEY",
            Self::ConfigTooLarge => "CODEC_CONFIG_TOO_LARGE",
            Self::SignatureTooLarge(_) => "CODEC_SIGNATURE_TOO_LARGE",
            Self::ValidationError(_) => "CODEC_VALIDATION_FAILED",
            Self::ExeTooSmall(_) => "CODEC_EXE_TOO_SMALL",
            Self::ConfigNotPresent => "CODEC_CONFIG_NOT_PRESENT",
            Self::UnsupportedHeaderVersion(_) => "CODEC_UNSUPPORTED_HEADER_VERSION",
            Self::InvalidConfigVersion(_) => "CODEC_INVALID_CONFIG_VERSION",
            Self::UnsupportedConfigVersion(_) => "CODEC_UNSUPPORTED_CONFIG_VERSION",
            Self::UnsupportedSignatureKeyType(_) => "CODEC_UNSUPPORTED_SIGNATURE_KEY_TYPE",
            Self::SignatureVerificationFailure(_) => "CODEC_SIGNATURE_VERIFICATION_FAILURE",
            Self::EncodingFailure(_) => "CODEC_ENCODING_FAILURE",
        }
    }
}

/// Errors surfaced by the registration processor and its backends.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The device id is not a well-formed UUID.
    #[error("Invalid device id: {0}")]
    InvalidUuid(String),
    /// The CSR is not a parseable PKCS#10 request.
    #[error("Invalid certificate signing request: {0}")]
    InvalidCsr(String),
    /// A transient backend failure; the request stays pending.
    #[error("Backend temporarily unavailable: {0}")]
    BackendTransient(String),
    /// A permanent backend failure; the request is terminal.
    #[error("Backend failure: {0}")]
    BackendPermanent(String),
}

impl ErrorCode for RegistrationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidUuid(_) => "REG_INVALID_UUID",
            Self::InvalidCsr(_) => "REG_INVALID_CSR",
            Self::BackendTransient(_) => "REG_BACKEND_TRANSIENT",
            Self::BackendPermanent(_) => "REG_BACKEND_PERMANENT",
        }
    }
}

/// Fatal configuration errors raised while assembling the seeder at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required listen address list is empty.
    #[error("Server '{0}' has no listen addresses")]
    NoAddresses(String),
    /// A key/certificate pair could not be loaded or does not match.
    #[error("Key/certificate error for '{path}': {reason}")]
    KeyPair {
        /// Offending file path.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// The embedded-config signing key is not ECDSA P-256.
    #[error("Signing key is not ECDSA P-256: {0}")]
    KeyNotEcdsaP256(String),
    /// A CA pool file yielded no usable certificates.
    #[error("No certificates added from '{0}'")]
    NoCertsAdded(String),
    /// A referenced file could not be read.
    #[error("Cannot read '{path}': {reason}")]
    Unreadable {
        /// Offending file path.
        path: String,
        /// What went wrong.
        reason: String,
    },
    /// Only one half of the local registry key/cert pair was configured.
    #[error("registry_settings requires both cert_path and key_path")]
    RegistrySettingsIncomplete,
    /// Anything else that makes the configuration unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoAddresses(_) => "CFG_NO_ADDRESSES",
            Self::KeyPair { .. } => "CFG_KEY_PAIR",
            Self::KeyNotEcdsaP256(_) => "CFG_KEY_NOT_ECDSA_P256",
            Self::NoCertsAdded(_) => "CFG_NO_CERTS_ADDED",
            Self::Unreadable { .. } => "CFG_UNREADABLE",
            Self::RegistrySettingsIncomplete => "CFG_REGISTRY_INCOMPLETE",
            Self::Invalid(_) => "CFG_INVALID",
        }
    }
}

/// Runtime errors from the multi-listener server control plane.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Binding a listener socket failed.
    #[error("Bind failed on {addr}: {reason}")]
    Bind {
        /// Address that failed to bind.
        addr: String,
        /// What went wrong.
        reason: String,
    },
    /// A TLS configuration reload was rejected.
    #[error("TLS reload failed: {0}")]
    TlsReload(String),
    /// The dynamic link-local server found no usable neighbours.
    #[error("No management neighbours resolved for device '{0}'")]
    NoNeighbours(String),
    /// The topology store has no record for this host.
    #[error("Device '{0}' not found in topology")]
    DeviceNotFound(String),
    /// An engine exited with an error.
    #[error("Engine '{name}' failed: {reason}")]
    Engine {
        /// Engine label.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

impl ErrorCode for ServerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "SRV_BIND_FAILED",
            Self::TlsReload(_) => "SRV_TLS_RELOAD",
            Self::NoNeighbours(_) => "SRV_NO_NEIGHBOURS",
            Self::DeviceNotFound(_) => "SRV_DEVICE_NOT_FOUND",
            Self::Engine { .. } => "SRV_ENGINE_FAILED",
        }
    }
}
