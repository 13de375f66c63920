// ABOUTME: Generic connection setup parameterized by its state marker.
// ABOUTME: Holds what every state shares; state-specific data lives in the marker.

use std::collections::BTreeMap;

use crate::connection::{ConnectionState, NetworkServiceRequest};
use crate::mechanism::MechanismType;
use crate::types::{ConnectionId, NetworkServiceName};

use super::error::RequestError;
use super::state::{Addressed, Programmed, Requested};

/// A connection being established, parameterized by its current state.
///
/// Nothing in here is visible outside the request that owns it until
/// `activate()` produces the final `Connection`.
#[derive(Debug)]
pub struct ConnectionSetup<S> {
    pub(crate) id: ConnectionId,
    pub(crate) sequence: u64,
    pub(crate) network_service: NetworkServiceName,
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) hints: BTreeMap<String, String>,
    pub(crate) state: S,
}

impl ConnectionSetup<Requested> {
    /// Validate `request` and start a setup for connection number `sequence`.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Validation` for an empty or malformed service name.
    pub fn new(request: NetworkServiceRequest, sequence: u64) -> Result<Self, RequestError> {
        if request.network_service.trim().is_empty() {
            return Err(RequestError::Validation(
                "network service name is required".to_string(),
            ));
        }
        let network_service = NetworkServiceName::new(request.network_service.trim())?;

        // Context entries meaningful to some mechanism are hints; the rest are labels.
        let (hints, labels): (BTreeMap<_, _>, BTreeMap<_, _>) =
            request.context.into_iter().partition(|(key, _)| {
                MechanismType::ALL
                    .iter()
                    .any(|t| t.schema().knows(key.as_str()))
            });

        Ok(ConnectionSetup {
            id: ConnectionId::new(sequence.to_string()),
            sequence,
            network_service,
            labels,
            hints,
            state: Requested {
                preferences: request.mechanism_preferences,
            },
        })
    }
}

impl<S> ConnectionSetup<S> {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn network_service(&self) -> &NetworkServiceName {
        &self.network_service
    }
}

impl ConnectionSetup<Addressed> {
    pub fn source_address(&self) -> std::net::Ipv4Addr {
        self.state.addresses.source
    }

    pub fn destination_address(&self) -> std::net::Ipv4Addr {
        self.state.addresses.destination
    }
}

impl ConnectionSetup<Programmed> {
    /// The record as it was programmed; still in `REQUESTED`.
    pub fn state(&self) -> ConnectionState {
        self.state.connection.state
    }
}
