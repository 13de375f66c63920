// ABOUTME: State transition methods for connection setup.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::future::Future;

use chrono::Utc;
use tokio::time::Instant;

use crate::address::AddressAllocator;
use crate::connection::{Connection, ConnectionState};
use crate::dataplane::{Dataplane, DataplaneError};
use crate::mechanism::{NegotiationContext, negotiate};

use super::error::RequestError;
use super::settings::EndpointSettings;
use super::setup::ConnectionSetup;
use super::state::{Addressed, Negotiated, Programmed, Requested};

impl<S> ConnectionSetup<S> {
    fn transition<T>(self, next: impl FnOnce(S) -> T) -> ConnectionSetup<T> {
        ConnectionSetup {
            id: self.id,
            sequence: self.sequence,
            network_service: self.network_service,
            labels: self.labels,
            hints: self.hints,
            state: next(self.state),
        }
    }
}

// =============================================================================
// Requested -> Negotiated
// =============================================================================

impl ConnectionSetup<Requested> {
    /// Pick a mechanism from the requester's preferences and complete its
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Mechanism` when no preference is supported or a
    /// required parameter is missing or invalid.
    #[must_use = "connection setup state must be used"]
    pub fn negotiate(
        self,
        settings: &EndpointSettings,
    ) -> Result<ConnectionSetup<Negotiated>, RequestError> {
        let ctx = NegotiationContext {
            supported: &settings.supported,
            workspace: &settings.workspace,
            netns_inode: settings.netns_inode,
            network_service: &self.network_service,
            connection_id: &self.id,
            sequence: self.sequence,
        };
        let negotiated = negotiate(&self.state.preferences, &self.hints, &ctx)?;
        Ok(self.transition(|_| Negotiated { negotiated }))
    }
}

// =============================================================================
// Negotiated -> Addressed
// =============================================================================

impl ConnectionSetup<Negotiated> {
    /// Take a source/destination address pair for the connection.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Allocation` when the pool is exhausted.
    #[must_use = "connection setup state must be used"]
    pub fn allocate(
        self,
        allocator: &AddressAllocator,
    ) -> Result<ConnectionSetup<Addressed>, RequestError> {
        let addresses = allocator.allocate_pair()?;
        tracing::debug!(
            connection = %self.id,
            "Allocated {} -> {}",
            addresses.source,
            addresses.destination
        );
        Ok(self.transition(|state| Addressed {
            negotiated: state.negotiated,
            addresses,
        }))
    }
}

// =============================================================================
// Addressed -> Programmed
// =============================================================================

impl ConnectionSetup<Addressed> {
    /// Program the connection's interface into the service's bridge domain.
    ///
    /// The bridge domain must already exist.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Dataplane` if the dataplane fails or `deadline`
    /// passes first.
    #[must_use = "connection setup state must be used"]
    pub async fn program<D: Dataplane + ?Sized>(
        self,
        dataplane: &D,
        settings: &EndpointSettings,
        deadline: Instant,
    ) -> Result<ConnectionSetup<Programmed>, RequestError> {
        let connection = self.record(settings);
        let bridge_domain = settings.bridge_domain_for(&self.network_service);

        within_deadline(
            "program connection",
            deadline,
            dataplane.program_connection(&connection, &bridge_domain),
        )
        .await?;

        Ok(self.transition(|_| Programmed { connection }))
    }

    fn record(&self, settings: &EndpointSettings) -> Connection {
        Connection {
            id: self.id.clone(),
            network_service: self.network_service.clone(),
            mechanism: self.state.negotiated.mechanism.clone(),
            source_address: self.state.addresses.source,
            destination_address: self.state.addresses.destination,
            state: ConnectionState::Requested,
            endpoint: settings.endpoint_name.clone(),
            labels: self.labels.clone(),
            established_at: Utc::now(),
        }
    }
}

// =============================================================================
// Programmed -> Connection (ACTIVE)
// =============================================================================

impl ConnectionSetup<Programmed> {
    /// Finish setup, yielding the active connection.
    #[must_use = "the active connection must be registered"]
    pub fn activate(self) -> Connection {
        let mut connection = self.state.connection;
        connection.state = ConnectionState::Active;
        connection.established_at = Utc::now();
        connection
    }
}

/// Run a dataplane call, failing with `DataplaneError::Timeout` at `deadline`.
pub(crate) async fn within_deadline<T, F>(
    operation: &'static str,
    deadline: Instant,
    call: F,
) -> Result<T, DataplaneError>
where
    F: Future<Output = Result<T, DataplaneError>>,
{
    let started = Instant::now();
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(DataplaneError::Timeout {
            operation,
            elapsed: started.elapsed(),
        }),
    }
}
