// Path: crates/types/src/config.rs
//! The seeder configuration tree (`seeder.toml`).

use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which topology role to assume when resolving our own device record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Try the Server role first, fall back to Switch.
    #[default]
    Auto,
    /// Only look for a Server record.
    Server,
    /// Only look for a Switch record.
    Switch,
}

/// Dynamic link-local listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DynLlConfig {
    /// Topology role selection.
    #[serde(default)]
    pub device_type: DeviceType,
    /// Our own device name; defaults to the host name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Port to bind on every discovered link-local address.
    #[serde(default = "default_dynll_port")]
    pub listening_port: u16,
}

fn default_dynll_port() -> u16 {
    80
}

/// A statically-addressed listener, with optional TLS.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericServerConfig {
    /// Socket addresses to bind.
    #[serde(default)]
    pub addresses: Vec<SocketAddr>,
    /// PEM private key; together with `cert_path` enables TLS.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// PEM certificate chain.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    /// PEM pool for optional client-certificate verification.
    #[serde(default)]
    pub client_ca_path: Option<PathBuf>,
}

/// The unauthenticated listener group serving stage0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsecureServerConfig {
    /// Bind to IPv6 link-local addresses of management neighbours.
    #[serde(default)]
    pub dyn_ll: Option<DynLlConfig>,
    /// Additionally bind fixed addresses.
    #[serde(default)]
    pub generic: Option<GenericServerConfig>,
}

/// Artifact source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding `<name>-<arch>` artifact files.
    pub directory: PathBuf,
}

/// Key material for signing embedded configurations.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedConfigGeneratorConfig {
    /// PEM ECDSA P-256 private key.
    pub key_path: PathBuf,
    /// PEM certificate matching the key.
    pub cert_path: PathBuf,
}

/// Values handed to devices inside embedded configurations and IPAM responses.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallerSettings {
    /// PEM CA the devices must trust for the seeder's TLS.
    pub server_ca_path: PathBuf,
    /// PEM CA anchoring embedded-config signatures.
    pub config_signature_ca_path: PathBuf,
    /// Host name devices use to reach the secure server.
    pub secure_server_name: String,
    /// Port of the secure server as reachable by devices.
    #[serde(default = "default_secure_port")]
    pub secure_server_port: u16,
    /// DNS servers handed out in IPAM responses.
    #[serde(default)]
    pub dns_servers: Vec<String>,
    /// NTP servers handed out in IPAM responses.
    #[serde(default)]
    pub ntp_servers: Vec<String>,
    /// Syslog sinks handed out in IPAM responses.
    #[serde(default)]
    pub syslog_servers: Vec<String>,
}

fn default_secure_port() -> u16 {
    8443
}

/// Local CA used to mint device client certificates.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// PEM CA certificate.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    /// PEM CA private key.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

/// Registration processor tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    /// Seconds between cache refresh sweeps.
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_secs(),
        }
    }
}

fn default_refresh_secs() -> u64 {
    60
}

/// Observability settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Bind address for the metrics/healthz listener; disabled when absent.
    #[serde(default)]
    pub metrics_address: Option<SocketAddr>,
}

/// Topology source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyConfig {
    /// TOML file describing devices, neighbours and software targets.
    pub path: PathBuf,
}

/// Top-level seeder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SeederConfig {
    /// Unauthenticated listener group.
    #[serde(default)]
    pub insecure_server: InsecureServerConfig,
    /// Mutually-authenticated listener group.
    pub secure_server: GenericServerConfig,
    /// Artifact source.
    pub artifacts: ArtifactsConfig,
    /// Embedded-config signing material.
    pub embedded_config_generator: EmbeddedConfigGeneratorConfig,
    /// Device-facing settings.
    pub installer_settings: InstallerSettings,
    /// Optional local CA for minting client certificates.
    #[serde(default)]
    pub registry_settings: Option<RegistrySettings>,
    /// Registration processor tuning.
    #[serde(default)]
    pub registration: RegistrationConfig,
    /// Observability settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Topology source.
    pub topology: TopologyConfig,
}

impl SeederConfig {
    /// Startup validation. Failures here are fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secure_server.addresses.is_empty() {
            return Err(ConfigError::NoAddresses("secure_server".to_string()));
        }
        if self.secure_server.key_path.is_none() || self.secure_server.cert_path.is_none() {
            return Err(ConfigError::Invalid(
                "secure_server requires key_path and cert_path".to_string(),
            ));
        }
        if let Some(generic) = &self.insecure_server.generic {
            if generic.addresses.is_empty() {
                return Err(ConfigError::NoAddresses("insecure_server.generic".to_string()));
            }
            if generic.key_path.is_some() != generic.cert_path.is_some() {
                return Err(ConfigError::Invalid(
                    "insecure_server.generic requires key_path and cert_path together".to_string(),
                ));
            }
        }
        if let Some(registry) = &self.registry_settings {
            if registry.cert_path.is_some() != registry.key_path.is_some() {
                return Err(ConfigError::RegistrySettingsIncomplete);
            }
        }
        if self.installer_settings.secure_server_name.is_empty() {
            return Err(ConfigError::Invalid(
                "installer_settings.secure_server_name must be set".to_string(),
            ));
        }
        Ok(())
    }
}
