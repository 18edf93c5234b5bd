// Path: crates/api/src/artifact.rs
//! The artifact source seam.

use async_trait::async_trait;
use bytes::Bytes;
use dasboot_types::Arch;
use thiserror::Error;

/// Errors an artifact provider can surface.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// No artifact with this name exists.
    #[error("Artifact '{0}' not found")]
    NotFound(String),
    /// The provider failed to produce the artifact bytes.
    #[error("Artifact '{name}' unavailable: {reason}")]
    Unavailable {
        /// Artifact name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Read-only source of installer and image artifacts.
///
/// Stage installers are keyed `<stage>-<arch>`; NOS and agent images carry
/// the names the topology store hands out. Artifacts are read fully into
/// memory so the gateway can append an embedded configuration before
/// streaming.
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    /// Fetches the artifact with the given name.
    async fn fetch(&self, name: &str) -> Result<Bytes, ArtifactError>;
}

/// Canonical name of a stage installer artifact for an architecture.
pub fn stage_artifact_name(stage: &str, arch: Arch) -> String {
    format!("{stage}-{arch}")
}
