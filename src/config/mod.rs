// ABOUTME: Configuration types and parsing for nsendpoint.yml.
// ABOUTME: Handles YAML parsing, environment overrides and conversion into runtime parts.

mod deserialize;
mod init;

pub use init::init_config;

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::address::AddressAllocator;
use crate::dataplane::{BridgeDomainTemplate, DataplaneSettings};
use crate::endpoint::EndpointSettings;
use crate::error::{Error, Result};
use crate::mechanism::{self, MechanismType};
use crate::monitor::{ConnectionMonitor, DEFAULT_QUEUE_DEPTH};
use crate::types::NetworkServiceName;

use deserialize::deserialize_mechanisms;

pub const CONFIG_FILENAME: &str = "nsendpoint.yml";
pub const CONFIG_FILENAME_ALT: &str = "nsendpoint.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".nsendpoint/config.yml";

/// Overrides `agent.endpoint` when set.
pub const ENV_AGENT_ENDPOINT: &str = "NSENDPOINT_AGENT_ENDPOINT";
/// Overrides `workspace` when set.
pub const ENV_WORKSPACE: &str = "NSENDPOINT_WORKSPACE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub network_service: NetworkServiceName,

    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: String,

    pub agent: AgentConfig,

    pub addressing: AddressingConfig,

    #[serde(
        default = "default_mechanisms",
        deserialize_with = "deserialize_mechanisms"
    )]
    pub mechanisms: NonEmpty<MechanismType>,

    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    #[serde(default)]
    pub netns_inode: Option<u64>,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub bridge_domain: BridgeDomainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// `host:port` of the dataplane agent.
    pub endpoint: String,
    #[serde(default = "default_agent_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressingConfig {
    /// First address handed out.
    pub base: Ipv4Addr,
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeDomainConfig {
    /// Bridge domain name for `network_service` (default `bd-<service>`).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub template: BridgeDomainTemplate,
}

fn default_endpoint_name() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

fn default_mechanisms() -> NonEmpty<MechanismType> {
    NonEmpty::from((MechanismType::Memif, vec![MechanismType::Kernel]))
}

fn default_workspace() -> PathBuf {
    PathBuf::from("/var/lib/networkservicemesh")
}

fn default_agent_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_prefix_len() -> u8 {
    24
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Apply `NSENDPOINT_*` environment overrides.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENV_AGENT_ENDPOINT)
            && !endpoint.trim().is_empty()
        {
            self.agent.endpoint = endpoint.trim().to_string();
        }
        if let Ok(workspace) = std::env::var(ENV_WORKSPACE)
            && !workspace.trim().is_empty()
        {
            self.workspace = PathBuf::from(workspace.trim());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "agent.endpoint cannot be empty".to_string(),
            ));
        }
        if self.monitor.queue_depth == 0 {
            return Err(Error::InvalidConfig(
                "monitor.queue_depth must be at least 1".to_string(),
            ));
        }
        if let Some(name) = &self.bridge_domain.name
            && name.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "bridge_domain.name cannot be empty".to_string(),
            ));
        }
        AddressAllocator::new(self.addressing.base, self.addressing.prefix_len)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(())
    }

    /// Network namespace inode: configured value, else this process's.
    pub fn resolve_netns_inode(&self) -> Option<u64> {
        self.netns_inode.or_else(|| match mechanism::current_netns_inode() {
            Ok(inode) => Some(inode),
            Err(e) => {
                tracing::warn!("Cannot read own network namespace inode: {}", e);
                None
            }
        })
    }

    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            endpoint_name: self.endpoint_name.clone(),
            network_service: self.network_service.clone(),
            bridge_domain_name: self.bridge_domain.name.clone(),
            supported: self.mechanisms.iter().copied().collect(),
            workspace: self.workspace.clone(),
            netns_inode: self.resolve_netns_inode(),
            dataplane_timeout: self.agent.timeout,
        }
    }

    pub fn dataplane_settings(&self) -> DataplaneSettings {
        DataplaneSettings {
            bridge_domain: self.bridge_domain.template,
            address_prefix_len: self.addressing.prefix_len,
        }
    }

    pub fn allocator(&self) -> Result<AddressAllocator> {
        AddressAllocator::new(self.addressing.base, self.addressing.prefix_len)
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn connection_monitor(&self) -> ConnectionMonitor {
        ConnectionMonitor::new(self.monitor.queue_depth)
    }

    pub fn template() -> Self {
        Config {
            network_service: NetworkServiceName::new("icmp-responder")
                .expect("template service name is valid"),
            endpoint_name: default_endpoint_name(),
            agent: AgentConfig {
                endpoint: "127.0.0.1:9111".to_string(),
                timeout: default_agent_timeout(),
            },
            addressing: AddressingConfig {
                base: Ipv4Addr::new(10, 20, 1, 1),
                prefix_len: default_prefix_len(),
            },
            mechanisms: default_mechanisms(),
            workspace: default_workspace(),
            netns_inode: None,
            monitor: MonitorConfig::default(),
            bridge_domain: BridgeDomainConfig::default(),
        }
    }
}
