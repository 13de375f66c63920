// ABOUTME: Forwarding configuration sent to the dataplane agent.
// ABOUTME: Bridge domains and memif/kernel/vxlan interfaces, serialized as JSON.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mechanism::{MechanismConfig, MemifRole};
use crate::types::{ConnectionId, InterfaceId};

/// One Put/Del payload for the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChange {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bridge_domains: Vec<BridgeDomain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Interface>,
}

impl DataChange {
    pub fn bridge_domain(bd: BridgeDomain) -> Self {
        Self {
            bridge_domains: vec![bd],
            interfaces: Vec::new(),
        }
    }

    pub fn interface(iface: Interface) -> Self {
        Self {
            bridge_domains: Vec::new(),
            interfaces: vec![iface],
        }
    }
}

/// L2 bridge domain shared by every connection of one network service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDomain {
    pub name: String,
    pub flood: bool,
    pub unknown_unicast_flood: bool,
    pub forward: bool,
    pub learn: bool,
    pub arp_termination: bool,
    pub mac_age: u32,
}

/// Bridge domain flags applied to every domain the endpoint creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDomainTemplate {
    #[serde(default = "default_true")]
    pub flood: bool,
    #[serde(default = "default_true")]
    pub unknown_unicast_flood: bool,
    #[serde(default)]
    pub forward: bool,
    #[serde(default = "default_true")]
    pub learn: bool,
    #[serde(default)]
    pub arp_termination: bool,
    #[serde(default)]
    pub mac_age: u32,
}

fn default_true() -> bool {
    true
}

impl Default for BridgeDomainTemplate {
    fn default() -> Self {
        Self {
            flood: true,
            unknown_unicast_flood: true,
            forward: false,
            learn: true,
            arp_termination: false,
            mac_age: 0,
        }
    }
}

impl BridgeDomainTemplate {
    pub fn named(&self, name: &str) -> BridgeDomain {
        BridgeDomain {
            name: name.to_string(),
            flood: self.flood,
            unknown_unicast_flood: self.unknown_unicast_flood,
            forward: self.forward,
            learn: self.learn,
            arp_termination: self.arp_termination,
            mac_age: self.mac_age,
        }
    }
}

/// Dataplane interface realizing one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: InterfaceId,
    pub enabled: bool,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_domain: Option<String>,
    #[serde(flatten)]
    pub kind: InterfaceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InterfaceKind {
    Memif {
        master: bool,
        socket_filename: PathBuf,
    },
    Kernel {
        netns_inode: u64,
        host_if_name: String,
    },
    Vxlan {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        vni: u32,
    },
}

impl From<&MechanismConfig> for InterfaceKind {
    fn from(config: &MechanismConfig) -> Self {
        match config {
            MechanismConfig::Memif {
                socket_file, role, ..
            } => InterfaceKind::Memif {
                master: *role == MemifRole::Master,
                socket_filename: socket_file.clone(),
            },
            MechanismConfig::Kernel {
                netns_inode,
                interface_name,
                ..
            } => InterfaceKind::Kernel {
                netns_inode: *netns_inode,
                host_if_name: interface_name.clone(),
            },
            MechanismConfig::Vxlan { src, dst, vni } => InterfaceKind::Vxlan {
                src: *src,
                dst: *dst,
                vni: *vni,
            },
        }
    }
}

/// Dataplane interface name for a connection.
pub fn interface_id(connection: &ConnectionId) -> InterfaceId {
    InterfaceId::new(format!("nse-{connection}"))
}
