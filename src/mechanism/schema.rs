// ABOUTME: Per-mechanism parameter schemas and validation into typed configs.
// ABOUTME: Raw key/value maps are checked here once; everything downstream is typed.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::MechanismError;
use super::keys;

/// Largest VXLAN network identifier (24 bits).
const MAX_VNI: u32 = (1 << 24) - 1;

/// Connection mechanism types this crate knows how to realize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MechanismType {
    Kernel,
    Memif,
    Vxlan,
}

impl MechanismType {
    pub const ALL: [MechanismType; 3] = [
        MechanismType::Kernel,
        MechanismType::Memif,
        MechanismType::Vxlan,
    ];

    /// Wire token for this mechanism.
    pub fn as_str(&self) -> &'static str {
        match self {
            MechanismType::Kernel => keys::KERNEL,
            MechanismType::Memif => keys::MEMIF,
            MechanismType::Vxlan => keys::VXLAN,
        }
    }

    pub fn schema(&self) -> MechanismSchema {
        match self {
            MechanismType::Memif => MechanismSchema {
                mechanism_type: *self,
                required: &[keys::NETNS_INODE, keys::INTERFACE_NAME, keys::SOCKET_FILENAME],
                optional: &[keys::WORKSPACE],
                role_required: true,
            },
            MechanismType::Kernel => MechanismSchema {
                mechanism_type: *self,
                required: &[keys::NETNS_INODE, keys::INTERFACE_NAME],
                optional: &[keys::WORKSPACE],
                role_required: false,
            },
            MechanismType::Vxlan => MechanismSchema {
                mechanism_type: *self,
                required: &[keys::SRC_IP, keys::DST_IP, keys::VNI],
                optional: &[],
                role_required: false,
            },
        }
    }
}

impl fmt::Display for MechanismType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MechanismType {
    type Err = MechanismError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            keys::KERNEL => Ok(MechanismType::Kernel),
            keys::MEMIF => Ok(MechanismType::Memif),
            keys::VXLAN => Ok(MechanismType::Vxlan),
            other => Err(MechanismError::Unsupported {
                requested: vec![other.to_string()],
            }),
        }
    }
}

/// Required and optional parameter keys for one mechanism type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanismSchema {
    pub mechanism_type: MechanismType,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Exactly one of the `master`/`slave` markers must be present.
    pub role_required: bool,
}

impl MechanismSchema {
    /// Whether `key` has a meaning for this mechanism.
    pub fn knows(&self, key: &str) -> bool {
        self.required.contains(&key)
            || self.optional.contains(&key)
            || (self.role_required && (key == keys::MASTER || key == keys::SLAVE))
    }
}

/// Which end of a memif link this side plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemifRole {
    Master,
    Slave,
}

/// Mechanism parameters after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MechanismConfig {
    Memif {
        netns_inode: u64,
        interface_name: String,
        socket_file: PathBuf,
        role: MemifRole,
        workspace: Option<PathBuf>,
    },
    Kernel {
        netns_inode: u64,
        interface_name: String,
        workspace: Option<PathBuf>,
    },
    Vxlan {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        vni: u32,
    },
}

impl MechanismConfig {
    pub fn mechanism_type(&self) -> MechanismType {
        match self {
            MechanismConfig::Memif { .. } => MechanismType::Memif,
            MechanismConfig::Kernel { .. } => MechanismType::Kernel,
            MechanismConfig::Vxlan { .. } => MechanismType::Vxlan,
        }
    }
}

/// Check `parameters` against the schema of `mechanism_type`.
///
/// Keys the schema does not know are ignored, so peers may send extra
/// parameters without breaking validation.
///
/// # Errors
///
/// Returns `MechanismError::MissingParameter` naming the first absent required
/// key, or `MechanismError::InvalidParameter` when a value does not parse.
pub fn validate(
    mechanism_type: MechanismType,
    parameters: &BTreeMap<String, String>,
) -> Result<MechanismConfig, MechanismError> {
    let schema = mechanism_type.schema();
    for key in schema.required {
        require(parameters, key)?;
    }

    match mechanism_type {
        MechanismType::Memif => Ok(MechanismConfig::Memif {
            netns_inode: parse_inode(parameters)?,
            interface_name: require(parameters, keys::INTERFACE_NAME)?.to_string(),
            socket_file: PathBuf::from(require(parameters, keys::SOCKET_FILENAME)?),
            role: parse_role(parameters)?,
            workspace: optional(parameters, keys::WORKSPACE).map(PathBuf::from),
        }),
        MechanismType::Kernel => Ok(MechanismConfig::Kernel {
            netns_inode: parse_inode(parameters)?,
            interface_name: require(parameters, keys::INTERFACE_NAME)?.to_string(),
            workspace: optional(parameters, keys::WORKSPACE).map(PathBuf::from),
        }),
        MechanismType::Vxlan => Ok(MechanismConfig::Vxlan {
            src: parse_ip(parameters, keys::SRC_IP)?,
            dst: parse_ip(parameters, keys::DST_IP)?,
            vni: parse_vni(parameters)?,
        }),
    }
}

fn require<'a>(
    parameters: &'a BTreeMap<String, String>,
    key: &str,
) -> Result<&'a str, MechanismError> {
    optional(parameters, key).ok_or_else(|| MechanismError::missing(key))
}

fn optional<'a>(parameters: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_inode(parameters: &BTreeMap<String, String>) -> Result<u64, MechanismError> {
    let raw = require(parameters, keys::NETNS_INODE)?;
    raw.parse::<u64>()
        .map_err(|_| MechanismError::invalid(keys::NETNS_INODE, format!("not an inode: {raw}")))
}

fn parse_role(parameters: &BTreeMap<String, String>) -> Result<MemifRole, MechanismError> {
    let master = parameters.contains_key(keys::MASTER);
    let slave = parameters.contains_key(keys::SLAVE);
    match (master, slave) {
        (true, false) => Ok(MemifRole::Master),
        (false, true) => Ok(MemifRole::Slave),
        (true, true) => Err(MechanismError::invalid(
            keys::SLAVE,
            "both master and slave markers present",
        )),
        (false, false) => Err(MechanismError::missing(keys::MASTER)),
    }
}

fn parse_ip(parameters: &BTreeMap<String, String>, key: &str) -> Result<Ipv4Addr, MechanismError> {
    let raw = require(parameters, key)?;
    raw.parse::<Ipv4Addr>()
        .map_err(|_| MechanismError::invalid(key, format!("not an IPv4 address: {raw}")))
}

fn parse_vni(parameters: &BTreeMap<String, String>) -> Result<u32, MechanismError> {
    let raw = require(parameters, keys::VNI)?;
    match raw.parse::<u32>() {
        Ok(vni) if (1..=MAX_VNI).contains(&vni) => Ok(vni),
        _ => Err(MechanismError::invalid(
            keys::VNI,
            format!("must be in 1..={MAX_VNI}, got {raw}"),
        )),
    }
}
