// Path: crates/api/src/topology.rs
//! The read-only topology/inventory seam.

use async_trait::async_trait;
use bytes::Bytes;
use dasboot_types::ipam::InterfaceAddresses;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors the topology store can surface.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// The underlying store could not be read.
    #[error("Topology store unavailable: {0}")]
    Unavailable(String),
    /// The stored record is malformed.
    #[error("Invalid topology record for '{subject}': {reason}")]
    InvalidRecord {
        /// Device or connection the record belongs to.
        subject: String,
        /// What is malformed.
        reason: String,
    },
}

/// Role a device plays in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// A seeder/controller host.
    Server,
    /// A managed switch.
    Switch,
}

/// One management-network connection from a device to a neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementConnection {
    /// Name of the neighbour device.
    pub neighbour: String,
    /// Local NIC name carrying this connection, when recorded.
    pub interface_name: Option<String>,
    /// Local NIC MAC address, when recorded. Lower-case, colon-separated.
    pub mac: Option<String>,
}

/// A device record as held by the topology store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Device name (host name for servers).
    pub name: String,
    /// Device id when one is assigned.
    pub device_id: Option<Uuid>,
    /// Role of the device.
    pub role: DeviceRole,
    /// Management connections to neighbours.
    pub management: Vec<ManagementConnection>,
}

/// Target software versions for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSoftware {
    /// NOS flavour, e.g. `sonic`.
    pub nos_type: String,
    /// Artifact name of the NOS installer image.
    pub nos_installer_artifact: String,
    /// Artifact name of the ONIE updater image.
    pub onie_updater_artifact: String,
    /// Artifact name of the per-device agent binary.
    pub agent_artifact: String,
}

/// Read-only source of truth for device identity, neighbours, addressing and
/// target software versions.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// Looks up a device record by name and role.
    async fn device_by_name(
        &self,
        name: &str,
        role: DeviceRole,
    ) -> Result<Option<DeviceRecord>, TopologyError>;

    /// Address plan for the given interfaces of a device.
    ///
    /// Interfaces unknown to the topology are absent from the result.
    async fn interface_plan(
        &self,
        device_id: Uuid,
        interfaces: &[String],
    ) -> Result<BTreeMap<String, InterfaceAddresses>, TopologyError>;

    /// Target software versions for a device, when assigned.
    async fn software_for(&self, device_id: Uuid) -> Result<Option<DeviceSoftware>, TopologyError>;

    /// Per-device agent configuration document (YAML).
    async fn agent_config(&self, device_id: Uuid) -> Result<Option<Bytes>, TopologyError>;

    /// Per-device agent kubeconfig secret (YAML).
    async fn agent_kubeconfig(&self, device_id: Uuid) -> Result<Option<Bytes>, TopologyError>;

    /// Whether the asserted location UUID matches the stored rack position.
    async fn location_matches(
        &self,
        device_id: Uuid,
        location_uuid: Uuid,
    ) -> Result<bool, TopologyError>;
}
