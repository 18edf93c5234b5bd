// Path: crates/node/src/topology.rs
//! TOML-backed static topology store.
//!
//! The real deployment reads topology from the fabric controller; this
//! store loads the same shape from a file so a seeder can run against a
//! declarative lab setup and so the tests have a concrete store.

use async_trait::async_trait;
use bytes::Bytes;
use dasboot_api::topology::{
    DeviceRecord, DeviceRole, DeviceSoftware, ManagementConnection, TopologyError, TopologyStore,
};
use dasboot_types::ipam::InterfaceAddresses;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RoleSpec {
    Server,
    Switch,
}

impl From<RoleSpec> for DeviceRole {
    fn from(role: RoleSpec) -> Self {
        match role {
            RoleSpec::Server => DeviceRole::Server,
            RoleSpec::Switch => DeviceRole::Switch,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ManagementSpec {
    neighbour: String,
    #[serde(default)]
    interface_name: Option<String>,
    #[serde(default)]
    mac: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SoftwareSpec {
    nos_type: String,
    nos_installer_artifact: String,
    onie_updater_artifact: String,
    agent_artifact: String,
}

#[derive(Debug, Clone, Deserialize)]
struct InterfaceSpec {
    #[serde(default)]
    ip_cidrs: Vec<String>,
    #[serde(default)]
    vlan: u16,
    #[serde(default)]
    routes: Vec<String>,
    #[serde(default)]
    preferred: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceSpec {
    name: String,
    role: RoleSpec,
    #[serde(default)]
    device_id: Option<Uuid>,
    #[serde(default)]
    location_uuid: Option<Uuid>,
    #[serde(default)]
    management: Vec<ManagementSpec>,
    #[serde(default)]
    software: Option<SoftwareSpec>,
    #[serde(default)]
    interfaces: BTreeMap<String, InterfaceSpec>,
    #[serde(default)]
    agent_config: Option<String>,
    #[serde(default)]
    agent_kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    devices: Vec<DeviceSpec>,
}

/// An immutable topology loaded from a TOML file.
pub struct StaticTopology {
    devices: Vec<DeviceSpec>,
}

impl StaticTopology {
    /// Loads the topology file.
    pub fn load(path: &Path) -> Result<Self, TopologyError> {
        let text = std::fs::read_to_string(path).map_err(|e| TopologyError::Unavailable(
            format!("cannot read {}: {e}", path.display()),
        ))?;
        Self::parse(&text)
    }

    /// Parses topology TOML.
    pub fn parse(text: &str) -> Result<Self, TopologyError> {
        let file: TopologyFile = toml::from_str(text)
            .map_err(|e| TopologyError::Unavailable(format!("invalid topology: {e}")))?;
        Ok(Self {
            devices: file.devices,
        })
    }

    fn by_device_id(&self, device_id: Uuid) -> Option<&DeviceSpec> {
        self.devices
            .iter()
            .find(|d| d.device_id == Some(device_id))
    }
}

#[async_trait]
impl TopologyStore for StaticTopology {
    async fn device_by_name(
        &self,
        name: &str,
        role: DeviceRole,
    ) -> Result<Option<DeviceRecord>, TopologyError> {
        let found = self
            .devices
            .iter()
            .find(|d| d.name == name && DeviceRole::from(d.role) == role);
        Ok(found.map(|d| DeviceRecord {
            name: d.name.clone(),
            device_id: d.device_id,
            role,
            management: d
                .management
                .iter()
                .map(|m| ManagementConnection {
                    neighbour: m.neighbour.clone(),
                    interface_name: m.interface_name.clone(),
                    mac: m.mac.as_deref().map(str::to_ascii_lowercase),
                })
                .collect(),
        }))
    }

    async fn interface_plan(
        &self,
        device_id: Uuid,
        interfaces: &[String],
    ) -> Result<BTreeMap<String, InterfaceAddresses>, TopologyError> {
        let Some(device) = self.by_device_id(device_id) else {
            return Ok(BTreeMap::new());
        };
        let mut plan = BTreeMap::new();
        for name in interfaces {
            if let Some(spec) = device.interfaces.get(name) {
                plan.insert(
                    name.clone(),
                    InterfaceAddresses {
                        ip_cidrs: spec.ip_cidrs.clone(),
                        vlan: spec.vlan,
                        routes: spec.routes.clone(),
                        preferred: spec.preferred,
                    },
                );
            }
        }
        Ok(plan)
    }

    async fn software_for(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceSoftware>, TopologyError> {
        Ok(self.by_device_id(device_id).and_then(|d| {
            d.software.as_ref().map(|s| DeviceSoftware {
                nos_type: s.nos_type.clone(),
                nos_installer_artifact: s.nos_installer_artifact.clone(),
                onie_updater_artifact: s.onie_updater_artifact.clone(),
                agent_artifact: s.agent_artifact.clone(),
            })
        }))
    }

    async fn agent_config(&self, device_id: Uuid) -> Result<Option<Bytes>, TopologyError> {
        Ok(self
            .by_device_id(device_id)
            .and_then(|d| d.agent_config.as_ref())
            .map(|doc| Bytes::from(doc.clone().into_bytes())))
    }

    async fn agent_kubeconfig(&self, device_id: Uuid) -> Result<Option<Bytes>, TopologyError> {
        Ok(self
            .by_device_id(device_id)
            .and_then(|d| d.agent_kubeconfig.as_ref())
            .map(|doc| Bytes::from(doc.clone().into_bytes())))
    }

    async fn location_matches(
        &self,
        device_id: Uuid,
        location_uuid: Uuid,
    ) -> Result<bool, TopologyError> {
        let Some(device) = self.by_device_id(device_id) else {
            return Ok(false);
        };
        // A device with no recorded rack position cannot contradict the
        // assertion.
        Ok(device
            .location_uuid
            .map(|stored| stored == location_uuid)
            .unwrap_or(true))
    }
}
