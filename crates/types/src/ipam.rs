// Path: crates/types/src/ipam.rs
//! Shapes of the stage0 IPAM handshake.

use crate::arch::Arch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Body of `POST /stage0/ipam`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpamRequest {
    /// Architecture the device reports.
    pub arch: Arch,
    /// UUID uniquely identifying the switch.
    pub devid: Uuid,
    /// Rack-position UUID asserted by the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_uuid: Option<Uuid>,
    /// Signature over the location UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_uuid_signature: Option<String>,
    /// Interface names the device wants addresses for.
    pub interfaces: Vec<String>,
}

/// Address plan for one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddresses {
    /// CIDR-notated addresses to configure.
    pub ip_cidrs: Vec<String>,
    /// VLAN id, zero meaning untagged.
    #[serde(default)]
    pub vlan: u16,
    /// Routes to install via this interface.
    #[serde(default)]
    pub routes: Vec<String>,
    /// Whether stage0 should prefer this interface for the stage1 download.
    #[serde(default)]
    pub preferred: bool,
}

/// Response of `POST /stage0/ipam`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpamBinding {
    /// Address plan per requested interface.
    pub addresses: BTreeMap<String, InterfaceAddresses>,
    /// DNS servers to configure.
    #[serde(default)]
    pub dns_servers: Vec<String>,
    /// NTP servers to configure.
    #[serde(default)]
    pub ntp_servers: Vec<String>,
    /// Syslog sinks to configure.
    #[serde(default)]
    pub syslog_servers: Vec<String>,
    /// Where to download stage1 from.
    pub stage1_url: String,
}
