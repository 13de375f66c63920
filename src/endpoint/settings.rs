// ABOUTME: Immutable endpoint settings resolved from configuration at startup.
// ABOUTME: Kept outside any lock; only the allocator and bridge domain state mutate.

use std::path::PathBuf;
use std::time::Duration;

use crate::mechanism::MechanismType;
use crate::types::NetworkServiceName;

/// Static facts about this endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Name stamped on every accepted connection.
    pub endpoint_name: String,
    /// Service this endpoint advertises; its bridge domain is created at startup.
    pub network_service: NetworkServiceName,
    /// Bridge domain name for `network_service`, overriding the default.
    pub bridge_domain_name: Option<String>,
    /// Mechanisms this endpoint can realize.
    pub supported: Vec<MechanismType>,
    /// Base directory for synthesized memif sockets.
    pub workspace: PathBuf,
    pub netns_inode: Option<u64>,
    /// Deadline applied by `request`/`close` when the caller gives none.
    pub dataplane_timeout: Duration,
}

impl EndpointSettings {
    pub fn new(network_service: NetworkServiceName) -> Self {
        Self {
            endpoint_name: gethostname::gethostname().to_string_lossy().into_owned(),
            network_service,
            bridge_domain_name: None,
            supported: vec![MechanismType::Memif, MechanismType::Kernel],
            workspace: PathBuf::from("/var/lib/networkservicemesh"),
            netns_inode: None,
            dataplane_timeout: Duration::from_secs(15),
        }
    }

    /// Bridge domain that connections of `service` are attached to.
    pub fn bridge_domain_for(&self, service: &NetworkServiceName) -> String {
        match &self.bridge_domain_name {
            Some(name) if *service == self.network_service => name.clone(),
            _ => format!("bd-{service}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_applies_only_to_own_service() {
        let own = NetworkServiceName::new("icmp-responder").unwrap();
        let other = NetworkServiceName::new("firewall").unwrap();
        let mut settings = EndpointSettings::new(own.clone());
        assert_eq!(settings.bridge_domain_for(&own), "bd-icmp-responder");

        settings.bridge_domain_name = Some("brd0".to_string());
        assert_eq!(settings.bridge_domain_for(&own), "brd0");
        assert_eq!(settings.bridge_domain_for(&other), "bd-firewall");
    }
}
