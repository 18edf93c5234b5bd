// Path: crates/server/src/dynll.rs
//! Dynamic link-local listener discovery.
//!
//! Stage0 devices reach the seeder over the management network before they
//! have routable addresses, so the seeder binds the IPv6 link-local address
//! of every local interface that faces a management neighbour in the
//! topology.

use dasboot_api::topology::{DeviceRole, ManagementConnection, TopologyStore};
use dasboot_types::config::{DeviceType, DynLlConfig};
use dasboot_types::ServerError;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use tracing::{debug, info, warn};

/// A local NIC as seen by `getifaddrs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInterface {
    /// Interface name.
    pub name: String,
    /// MAC address, lower-case colon-separated, when the interface has one.
    pub mac: Option<String>,
    /// IPv6 link-local addresses with their scope ids.
    pub link_local: Vec<(Ipv6Addr, u32)>,
}

/// Enumerates local interfaces, collecting MAC and link-local addresses.
pub fn local_interfaces() -> Result<Vec<LocalInterface>, ServerError> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(|e| ServerError::Bind {
        addr: "getifaddrs".to_string(),
        reason: e.to_string(),
    })?;

    let mut interfaces: Vec<LocalInterface> = Vec::new();
    for ifaddr in addrs {
        let idx = match interfaces
            .iter()
            .position(|i| i.name == ifaddr.interface_name)
        {
            Some(idx) => idx,
            None => {
                interfaces.push(LocalInterface {
                    name: ifaddr.interface_name.clone(),
                    mac: None,
                    link_local: Vec::new(),
                });
                interfaces.len() - 1
            }
        };
        let entry = &mut interfaces[idx];
        let Some(address) = ifaddr.address else {
            continue;
        };
        if let Some(link) = address.as_link_addr() {
            if let Some(mac) = link.addr() {
                entry.mac = Some(format_mac(&mac));
            }
        }
        if let Some(sin6) = address.as_sockaddr_in6() {
            let ip = sin6.ip();
            if is_link_local(&ip) {
                entry.link_local.push((ip, sin6.scope_id()));
            }
        }
    }
    Ok(interfaces)
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Maps management connections onto local link-local socket addresses.
///
/// A connection resolves by interface name first, then by MAC. Connections
/// that resolve to nothing are logged and skipped rather than failing the
/// whole listener group.
pub fn resolve_bindings(
    connections: &[ManagementConnection],
    interfaces: &[LocalInterface],
    port: u16,
) -> Vec<SocketAddr> {
    let mut bindings = Vec::new();
    for conn in connections {
        let matched = interfaces.iter().find(|iface| {
            conn.interface_name
                .as_deref()
                .is_some_and(|name| name == iface.name)
                || (conn.mac.is_some() && conn.mac == iface.mac)
        });
        let Some(iface) = matched else {
            warn!(target: "server", neighbour = %conn.neighbour,
                interface = conn.interface_name.as_deref().unwrap_or("-"),
                mac = conn.mac.as_deref().unwrap_or("-"),
                "management connection does not resolve to a local interface; skipping");
            continue;
        };
        if iface.link_local.is_empty() {
            warn!(target: "server", interface = %iface.name,
                "interface carries no IPv6 link-local address; skipping");
            continue;
        }
        for (ip, scope_id) in &iface.link_local {
            let addr = SocketAddr::V6(SocketAddrV6::new(*ip, port, 0, *scope_id));
            if !bindings.contains(&addr) {
                debug!(target: "server", neighbour = %conn.neighbour, %addr,
                    "management neighbour resolved");
                bindings.push(addr);
            }
        }
    }
    bindings
}

/// Resolves the seeder's own device record and returns the link-local
/// addresses to bind.
///
/// With `DeviceType::Auto` the Server role is tried first with a fallback
/// to Switch; it is a hard error when neither yields neighbours.
pub async fn discover(
    topology: &dyn TopologyStore,
    cfg: &DynLlConfig,
) -> Result<Vec<SocketAddr>, ServerError> {
    let device_name = match &cfg.device_name {
        Some(name) => name.clone(),
        None => hostname()?,
    };

    let roles: &[DeviceRole] = match cfg.device_type {
        DeviceType::Auto => &[DeviceRole::Server, DeviceRole::Switch],
        DeviceType::Server => &[DeviceRole::Server],
        DeviceType::Switch => &[DeviceRole::Switch],
    };

    let mut device = None;
    let mut found_any = false;
    for role in roles {
        match topology.device_by_name(&device_name, *role).await {
            Ok(Some(record)) => {
                found_any = true;
                if !record.management.is_empty() {
                    device = Some(record);
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) => {
                return Err(ServerError::Bind {
                    addr: device_name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
    let Some(device) = device else {
        return Err(if found_any {
            ServerError::NoNeighbours(device_name)
        } else {
            ServerError::DeviceNotFound(device_name)
        });
    };

    let interfaces = local_interfaces()?;
    let bindings = resolve_bindings(&device.management, &interfaces, cfg.listening_port);
    if bindings.is_empty() {
        return Err(ServerError::NoNeighbours(device_name));
    }
    info!(target: "server", device = %device.name, count = bindings.len(),
        "dynamic link-local bindings resolved");
    Ok(bindings)
}

fn hostname() -> Result<String, ServerError> {
    nix::unistd::gethostname()
        .map_err(|e| ServerError::Bind {
            addr: "hostname".to_string(),
            reason: e.to_string(),
        })
        .map(|h| h.to_string_lossy().into_owned())
}
