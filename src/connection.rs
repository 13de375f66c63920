// ABOUTME: Connection data model shared by the endpoint, monitor and wire surface.
// ABOUTME: Connection, its lifecycle state, requests, and monitor events.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mechanism::MechanismType;
use crate::types::{ConnectionId, NetworkServiceName};

/// Lifecycle state of a connection.
///
/// Only `Active`, `Closing` and `Closed` connections are ever visible through
/// the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionState {
    Init,
    Requested,
    Active,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Init => "INIT",
            ConnectionState::Requested => "REQUESTED",
            ConnectionState::Active => "ACTIVE",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::Closed => "CLOSED",
            ConnectionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Negotiated mechanism as carried on the wire.
///
/// `parameters` has already passed schema validation for `mechanism_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanism {
    #[serde(rename = "type")]
    pub mechanism_type: MechanismType,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// One entry of a requester's ordered mechanism preference list.
///
/// The type stays a raw token so that preferences this endpoint has never
/// heard of can be skipped instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanismPreference {
    #[serde(rename = "type")]
    pub mechanism_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl MechanismPreference {
    pub fn new(mechanism_type: impl Into<String>) -> Self {
        Self {
            mechanism_type: mechanism_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Consumer-supplied connection intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServiceRequest {
    pub network_service: String,
    #[serde(default)]
    pub mechanism_preferences: Vec<MechanismPreference>,
    /// Free-form hints; entries that match a mechanism key feed negotiation,
    /// the rest become connection labels.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl NetworkServiceRequest {
    pub fn new(network_service: impl Into<String>) -> Self {
        Self {
            network_service: network_service.into(),
            ..Default::default()
        }
    }

    pub fn prefer(mut self, preference: MechanismPreference) -> Self {
        self.mechanism_preferences.push(preference);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// An established or closing virtual link between a consumer and this endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub network_service: NetworkServiceName,
    pub mechanism: Mechanism,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
    pub state: ConnectionState,
    /// Name of the endpoint that accepted the connection.
    pub endpoint: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub established_at: DateTime<Utc>,
}

impl Connection {
    pub fn mechanism_type(&self) -> MechanismType {
        self.mechanism.mechanism_type
    }

    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }
}

/// Kind of a monitor event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    /// Full table, sent once per subscription.
    Initial,
    Update,
    Delete,
}

/// A change in the connection table as seen by a monitor subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub kind: EventKind,
    pub connections: BTreeMap<ConnectionId, Connection>,
}

impl ConnectionEvent {
    pub fn initial(connections: BTreeMap<ConnectionId, Connection>) -> Self {
        Self {
            kind: EventKind::Initial,
            connections,
        }
    }

    pub fn update(connection: Connection) -> Self {
        Self::single(EventKind::Update, connection)
    }

    pub fn delete(connection: Connection) -> Self {
        Self::single(EventKind::Delete, connection)
    }

    fn single(kind: EventKind, connection: Connection) -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(connection.id.clone(), connection);
        Self { kind, connections }
    }
}
