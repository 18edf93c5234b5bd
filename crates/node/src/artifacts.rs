// Path: crates/node/src/artifacts.rs
//! Directory-backed artifact provider.

use async_trait::async_trait;
use bytes::Bytes;
use dasboot_api::artifact::{ArtifactError, ArtifactProvider};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Serves artifacts out of a flat directory: `<dir>/<name>`.
pub struct DirArtifactProvider {
    dir: PathBuf,
}

impl DirArtifactProvider {
    /// Provider rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ArtifactProvider for DirArtifactProvider {
    async fn fetch(&self, name: &str) -> Result<Bytes, ArtifactError> {
        // Artifact names are flat identifiers; anything path-like is hostile.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ArtifactError::NotFound(name.to_string()));
        }
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(name.to_string()))
            }
            Err(e) => Err(ArtifactError::Unavailable {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
