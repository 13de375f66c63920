// ABOUTME: Dataplane capability trait used by the endpoint, and its agent-backed impl.
// ABOUTME: Translates connections into data changes and compensates rejected Puts.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection::Connection;
use crate::mechanism;

use super::agent::DataplaneAgent;
use super::error::DataplaneError;
use super::model::{BridgeDomainTemplate, DataChange, Interface, InterfaceKind, interface_id};

/// Forwarding operations the endpoint needs from a dataplane.
///
/// Implementations may block; callers bound every call with their own deadline.
#[async_trait]
pub trait Dataplane: Send + Sync {
    /// Make sure the bridge domain `name` exists. Calling it again for a name
    /// that already exists succeeds without doing anything.
    async fn ensure_bridge_domain(&self, name: &str) -> Result<(), DataplaneError>;

    /// Create the connection's interface and attach it to `bridge_domain`.
    async fn program_connection(
        &self,
        connection: &Connection,
        bridge_domain: &str,
    ) -> Result<(), DataplaneError>;

    /// Remove the connection's interface. Best effort: callers log failures.
    async fn teardown_connection(
        &self,
        connection: &Connection,
        bridge_domain: &str,
    ) -> Result<(), DataplaneError>;
}

/// Settings for translating connections into agent configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataplaneSettings {
    pub bridge_domain: BridgeDomainTemplate,
    /// Prefix length attached to interface addresses.
    pub address_prefix_len: u8,
}

/// `Dataplane` implemented on top of an agent's Put/Del calls.
pub struct AgentDataplane<A> {
    agent: A,
    settings: DataplaneSettings,
    bridge_domains: Mutex<HashSet<String>>,
}

impl<A> std::fmt::Debug for AgentDataplane<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDataplane")
            .field("settings", &self.settings)
            .field("bridge_domains", &*self.bridge_domains.lock())
            .finish()
    }
}

impl<A: DataplaneAgent> AgentDataplane<A> {
    pub fn new(agent: A, settings: DataplaneSettings) -> Self {
        Self {
            agent,
            settings,
            bridge_domains: Mutex::new(HashSet::new()),
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Put `change`; if the agent rejects it, Del the same change so no
    /// half-applied configuration is left behind.
    async fn apply(&self, change: &DataChange) -> Result<(), DataplaneError> {
        tracing::debug!("Sending data change to dataplane agent: {:?}", change);
        if let Err(put_err) = self.agent.put(change).await {
            tracing::warn!("Dataplane agent rejected put, compensating: {}", put_err);
            if let Err(del_err) = self.agent.del(change).await {
                tracing::warn!("Compensating delete failed: {}", del_err);
            }
            return Err(put_err.into());
        }
        Ok(())
    }

    fn interface_for(
        &self,
        connection: &Connection,
        bridge_domain: &str,
    ) -> Result<Interface, DataplaneError> {
        let config = mechanism::validate(
            connection.mechanism.mechanism_type,
            &connection.mechanism.parameters,
        )
        .map_err(|e| DataplaneError::InvalidConnection(format!("{}: {}", connection.id, e)))?;

        Ok(Interface {
            name: interface_id(&connection.id),
            enabled: true,
            ip_addresses: vec![format!(
                "{}/{}",
                connection.destination_address, self.settings.address_prefix_len
            )],
            bridge_domain: Some(bridge_domain.to_string()),
            kind: InterfaceKind::from(&config),
        })
    }
}

#[async_trait]
impl<A: DataplaneAgent> Dataplane for AgentDataplane<A> {
    async fn ensure_bridge_domain(&self, name: &str) -> Result<(), DataplaneError> {
        if self.bridge_domains.lock().contains(name) {
            return Ok(());
        }

        let change = DataChange::bridge_domain(self.settings.bridge_domain.named(name));
        self.apply(&change).await?;
        self.bridge_domains.lock().insert(name.to_string());
        tracing::info!("Created bridge domain {}", name);
        Ok(())
    }

    async fn program_connection(
        &self,
        connection: &Connection,
        bridge_domain: &str,
    ) -> Result<(), DataplaneError> {
        let iface = self.interface_for(connection, bridge_domain)?;
        self.apply(&DataChange::interface(iface)).await
    }

    async fn teardown_connection(
        &self,
        connection: &Connection,
        bridge_domain: &str,
    ) -> Result<(), DataplaneError> {
        let iface = self.interface_for(connection, bridge_domain)?;
        self.agent.del(&DataChange::interface(iface)).await?;
        Ok(())
    }
}
