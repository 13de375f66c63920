// ABOUTME: Config scaffolding for new endpoints.
// ABOUTME: Creates nsendpoint.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::NetworkServiceName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, service: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(s) = service {
        config.network_service =
            NetworkServiceName::new(s).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let mechanisms = config
        .mechanisms
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"network_service: {}
agent:
  endpoint: {}
  timeout: 15s
addressing:
  base: {}
  prefix_len: {}
mechanisms: [{}]
workspace: {}
# netns_inode: 4026531992   # default: read from /proc/self/ns/net
monitor:
  queue_depth: {}
bridge_domain:
  # name: bd-{}
  flood: true
  unknown_unicast_flood: true
  learn: true
"#,
        config.network_service,
        config.agent.endpoint,
        config.addressing.base,
        config.addressing.prefix_len,
        mechanisms,
        config.workspace.display(),
        config.monitor.queue_depth,
        config.network_service,
    )
}
