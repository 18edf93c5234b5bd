// Path: crates/types/src/stage.rs
//! Embedded installer configurations.
//!
//! Each installer stage carries one of these records, JSON-encoded and
//! signed, appended to its executable. The record universe is closed on
//! purpose: configurations are part of the trust boundary, so adding a
//! variant requires recompiling the seeder and the installers.

use crate::b64;
use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capability set every embedded configuration record provides to the codec.
pub trait ConfigRecord: Serialize + DeserializeOwned + Clone {
    /// The record's configuration version. Must be >= 1.
    fn version(&self) -> i64;

    /// Whether this record type can act on the given configuration version.
    fn supported_versions(&self, version: i64) -> bool;

    /// Record-specific semantic validation.
    fn validate(&self) -> Result<(), CodecError>;

    /// DER X.509 certificate of the configuration signer.
    fn signature_cert(&self) -> &[u8];

    /// Installs the signer certificate before serialization.
    fn set_signature_cert(&mut self, der: Vec<u8>);
}

fn require(field: &str, ok: bool) -> Result<(), CodecError> {
    if ok {
        Ok(())
    } else {
        Err(CodecError::ValidationError(format!("{field} must be set")))
    }
}

macro_rules! impl_record_common {
    ($ty:ty) => {
        fn version(&self) -> i64 {
            self.version
        }

        fn supported_versions(&self, version: i64) -> bool {
            version == 1
        }

        fn signature_cert(&self) -> &[u8] {
            &self.signature_cert
        }

        fn set_signature_cert(&mut self, der: Vec<u8>) {
            self.signature_cert = der;
        }
    };
}

/// Configuration embedded into the stage0 installer.
///
/// Stage0 runs inside ONIE before the device has any credentials, so this
/// record carries the trust anchors the device needs to validate everything
/// that follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage0Config {
    /// Configuration version.
    pub version: i64,
    /// DER X.509 certificate of the configuration signer.
    #[serde(with = "b64")]
    pub signature_cert: Vec<u8>,
    /// DER X.509 CA certificate the device must trust for the seeder's TLS.
    #[serde(with = "b64")]
    pub ca_cert_der: Vec<u8>,
    /// DER X.509 CA certificate anchoring embedded-config signatures.
    #[serde(with = "b64")]
    pub signature_ca_cert_der: Vec<u8>,
    /// URL of the seeder's IPAM endpoint for the stage0 handshake.
    pub ipam_url: String,
    /// `ONIE-*` HTTP request headers captured verbatim from the download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onie_headers: Option<BTreeMap<String, Vec<String>>>,
}

impl ConfigRecord for Stage0Config {
    impl_record_common!(Stage0Config);

    fn validate(&self) -> Result<(), CodecError> {
        require("ca_cert_der", !self.ca_cert_der.is_empty())?;
        require("signature_ca_cert_der", !self.signature_ca_cert_der.is_empty())?;
        require("ipam_url", !self.ipam_url.is_empty())
    }
}

/// Keylime attestation settings handed to stage1 when attestation is wired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylimeConfig {
    /// URL of the keylime registrar.
    pub registrar_url: String,
}

/// Configuration embedded into the stage1 installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage1Config {
    /// Configuration version.
    pub version: i64,
    /// DER X.509 certificate of the configuration signer.
    #[serde(with = "b64")]
    pub signature_cert: Vec<u8>,
    /// URL of the seeder's registration endpoint.
    pub register_url: String,
    /// URL from which stage2 is downloaded once registered.
    pub stage2_url: String,
    /// Optional keylime attestation settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keylime: Option<KeylimeConfig>,
}

impl ConfigRecord for Stage1Config {
    impl_record_common!(Stage1Config);

    fn validate(&self) -> Result<(), CodecError> {
        require("register_url", !self.register_url.is_empty())?;
        require("stage2_url", !self.stage2_url.is_empty())?;
        if let Some(keylime) = &self.keylime {
            require("keylime.registrar_url", !keylime.registrar_url.is_empty())?;
        }
        Ok(())
    }
}

/// Reference to a provisioner executable stage2 must run after the NOS install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerRef {
    /// Provisioner name, e.g. `hedgehog-agent`.
    pub name: String,
    /// Download URL for the provisioner executable.
    pub url: String,
}

/// Configuration embedded into the stage2 installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage2Config {
    /// Configuration version.
    pub version: i64,
    /// DER X.509 certificate of the configuration signer.
    #[serde(with = "b64")]
    pub signature_cert: Vec<u8>,
    /// URL of the NOS installer image for this device.
    pub nos_installer_url: String,
    /// URL of the ONIE updater image for this device.
    pub onie_updater_url: String,
    /// NOS flavour to install.
    pub nos_type: String,
    /// Provisioners to run after the NOS install.
    #[serde(default)]
    pub provisioners: Vec<ProvisionerRef>,
}

impl ConfigRecord for Stage2Config {
    impl_record_common!(Stage2Config);

    fn validate(&self) -> Result<(), CodecError> {
        require("nos_installer_url", !self.nos_installer_url.is_empty())?;
        require("onie_updater_url", !self.onie_updater_url.is_empty())?;
        require("nos_type", !self.nos_type.is_empty())?;
        for p in &self.provisioners {
            require("provisioners[].name", !p.name.is_empty())?;
            require("provisioners[].url", !p.url.is_empty())?;
        }
        Ok(())
    }
}

/// Configuration embedded into the hedgehog-agent provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgehogAgentProvisionerConfig {
    /// Configuration version.
    pub version: i64,
    /// DER X.509 certificate of the configuration signer.
    #[serde(with = "b64")]
    pub signature_cert: Vec<u8>,
    /// URL of the per-device agent binary.
    pub agent_url: String,
    /// URL of the per-device agent configuration document.
    pub agent_config_url: String,
    /// URL of the per-device agent kubeconfig secret.
    pub agent_kubeconfig_url: String,
}

impl ConfigRecord for HedgehogAgentProvisionerConfig {
    impl_record_common!(HedgehogAgentProvisionerConfig);

    fn validate(&self) -> Result<(), CodecError> {
        require("agent_url", !self.agent_url.is_empty())?;
        require("agent_config_url", !self.agent_config_url.is_empty())?;
        require("agent_kubeconfig_url", !self.agent_kubeconfig_url.is_empty())
    }
}
