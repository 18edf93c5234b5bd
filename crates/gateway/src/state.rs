// Path: crates/gateway/src/state.rs
//! Shared state behind both routers.

use dasboot_api::{ArtifactProvider, TopologyStore};
use dasboot_embedded_config::ConfigSigner;
use dasboot_registration::RegistrationProcessor;
use std::sync::Arc;

/// Device-facing values baked into embedded configurations and IPAM
/// responses, resolved from `installer_settings` at startup.
#[derive(Debug, Clone)]
pub struct InstallerBundle {
    /// DER CA certificate devices must trust for the seeder's TLS.
    pub server_ca_der: Vec<u8>,
    /// DER CA certificate anchoring embedded-config signatures.
    pub config_ca_der: Vec<u8>,
    /// Base URL of the secure server as reachable by devices, e.g.
    /// `https://seeder.fabric.local:8443`.
    pub secure_base_url: String,
    /// DNS servers handed out in IPAM responses.
    pub dns_servers: Vec<String>,
    /// NTP servers handed out in IPAM responses.
    pub ntp_servers: Vec<String>,
    /// Syslog sinks handed out in IPAM responses.
    pub syslog_servers: Vec<String>,
}

/// Everything the handlers need: collaborators plus the installer bundle.
pub struct GatewayState {
    /// Artifact source.
    pub artifacts: Arc<dyn ArtifactProvider>,
    /// Read-only topology store.
    pub topology: Arc<dyn TopologyStore>,
    /// Registration processor.
    pub processor: Arc<RegistrationProcessor>,
    /// Embedded-config signing identity.
    pub signer: Arc<ConfigSigner>,
    /// Device-facing settings.
    pub bundle: InstallerBundle,
}
