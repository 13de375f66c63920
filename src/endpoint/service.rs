// ABOUTME: The endpoint's RPC surface: Request, Close and MonitorConnections.
// ABOUTME: Sole writer to the connection monitor; programs the dataplane before publishing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::address::AddressAllocator;
use crate::connection::{Connection, ConnectionState, NetworkServiceRequest};
use crate::dataplane::Dataplane;
use crate::monitor::{ConnectionMonitor, Subscription};
use crate::types::ConnectionId;

use super::bridge::BridgeDomains;
use super::error::RequestError;
use super::settings::EndpointSettings;
use super::setup::ConnectionSetup;
use super::transitions::within_deadline;

/// A network service endpoint.
///
/// `request` and `close` may run concurrently from any number of tasks.
pub struct Endpoint<D> {
    settings: EndpointSettings,
    dataplane: D,
    allocator: AddressAllocator,
    monitor: ConnectionMonitor,
    bridge_domains: BridgeDomains,
    next_sequence: AtomicU64,
    closing: Mutex<HashSet<ConnectionId>>,
}

impl<D> std::fmt::Debug for Endpoint<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("settings", &self.settings)
            .field("allocator", &self.allocator)
            .field("connections", &self.monitor.len())
            .finish()
    }
}

impl<D: Dataplane> Endpoint<D> {
    pub fn new(
        settings: EndpointSettings,
        dataplane: D,
        allocator: AddressAllocator,
        monitor: ConnectionMonitor,
    ) -> Self {
        Self {
            settings,
            dataplane,
            allocator,
            monitor,
            bridge_domains: BridgeDomains::default(),
            next_sequence: AtomicU64::new(1),
            closing: Mutex::new(HashSet::new()),
        }
    }

    pub fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    pub fn dataplane(&self) -> &D {
        &self.dataplane
    }

    /// Read-only handle to the connection table.
    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Whether this endpoint has created the bridge domain for `name`.
    pub fn has_bridge_domain(&self, name: &str) -> bool {
        self.bridge_domains.is_created(name)
    }

    /// Create the advertised service's bridge domain ahead of the first request.
    ///
    /// Failure is logged and otherwise ignored; the first request retries it.
    pub async fn prepare(&self) {
        let name = self
            .settings
            .bridge_domain_for(&self.settings.network_service);
        let deadline = Instant::now() + self.settings.dataplane_timeout;
        match self
            .bridge_domains
            .ensure(&self.dataplane, &name, deadline)
            .await
        {
            Ok(()) => tracing::info!("Bridge domain {} ready", name),
            Err(e) => tracing::warn!("Could not create bridge domain {} at startup: {}", name, e),
        }
    }

    /// Establish a connection using the configured dataplane timeout.
    pub async fn request(&self, request: NetworkServiceRequest) -> Result<Connection, RequestError> {
        let deadline = Instant::now() + self.settings.dataplane_timeout;
        self.request_with_deadline(request, deadline).await
    }

    /// Establish a connection, giving up on the dataplane at `deadline`.
    ///
    /// On success the connection is `ACTIVE` and has been published to the
    /// monitor. On failure nothing is published; addresses already taken
    /// from the pool are not returned to it.
    ///
    /// # Errors
    ///
    /// See `RequestError`. Validation and negotiation errors happen before any
    /// resource is taken.
    pub async fn request_with_deadline(
        &self,
        request: NetworkServiceRequest,
        deadline: Instant,
    ) -> Result<Connection, RequestError> {
        tracing::info!("Request for network service received: {:?}", request);
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let id = ConnectionId::new(sequence.to_string());

        match self.establish(request, sequence, deadline).await {
            Ok(connection) => {
                tracing::info!(
                    connection = %connection.id,
                    service = %connection.network_service,
                    mechanism = %connection.mechanism_type(),
                    "Connection {} -> {} established",
                    connection.source_address,
                    connection.destination_address
                );
                Ok(connection)
            }
            Err(e) => {
                tracing::warn!(
                    connection = %id,
                    state = %ConnectionState::Failed,
                    "Request failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        request: NetworkServiceRequest,
        sequence: u64,
        deadline: Instant,
    ) -> Result<Connection, RequestError> {
        let setup = ConnectionSetup::new(request, sequence)?;
        let setup = setup.negotiate(&self.settings)?;
        let setup = setup.allocate(&self.allocator)?;

        let bridge_domain = self.settings.bridge_domain_for(setup.network_service());
        self.bridge_domains
            .ensure(&self.dataplane, &bridge_domain, deadline)
            .await?;

        let setup = setup.program(&self.dataplane, &self.settings, deadline).await?;
        let connection = setup.activate();

        if let Err(e) = self.monitor.add(connection.clone()) {
            tracing::error!("Connection table invariant broken: {}", e);
            let deadline = Instant::now() + self.settings.dataplane_timeout;
            if let Err(teardown) = within_deadline(
                "teardown connection",
                deadline,
                self.dataplane.teardown_connection(&connection, &bridge_domain),
            )
            .await
            {
                tracing::warn!(
                    connection = %connection.id,
                    "Compensating teardown failed: {}",
                    teardown
                );
            }
            return Err(RequestError::Internal(e.to_string()));
        }
        Ok(connection)
    }

    /// Close a connection using the configured dataplane timeout.
    pub async fn close(&self, connection: &Connection) {
        let deadline = Instant::now() + self.settings.dataplane_timeout;
        self.close_with_deadline(connection, deadline).await
    }

    /// Close a connection. Always succeeds from the caller's point of view.
    ///
    /// Unknown or already closed connections are a no-op. Dataplane teardown
    /// is attempted until `deadline`; whatever its outcome, the connection is
    /// removed from the monitor with a final `CLOSED` state.
    pub async fn close_with_deadline(&self, connection: &Connection, deadline: Instant) {
        let Some(mut current) = self.monitor.get(&connection.id) else {
            tracing::debug!(connection = %connection.id, "Close for unknown connection, nothing to do");
            return;
        };
        if !self.closing.lock().insert(current.id.clone()) {
            tracing::debug!(connection = %current.id, "Close already in progress");
            return;
        }

        tracing::info!(connection = %current.id, "Closing connection");
        current.state = ConnectionState::Closing;
        let bridge_domain = self.settings.bridge_domain_for(&current.network_service);
        let guard = ClosingGuard {
            closing: &self.closing,
            monitor: &self.monitor,
            connection: current.clone(),
        };

        if let Err(e) = within_deadline(
            "teardown connection",
            deadline,
            self.dataplane.teardown_connection(&current, &bridge_domain),
        )
        .await
        {
            tracing::warn!(
                connection = %current.id,
                "Dataplane teardown failed, closing locally: {}",
                e
            );
        }

        drop(guard);
        tracing::info!(connection = %current.id, "Connection closed");
    }

    /// Stream of connection table changes, starting with a full snapshot.
    pub fn monitor_connections(&self) -> Subscription {
        self.monitor.subscribe()
    }
}

/// Finishes a close when dropped, whether the close ran to completion or its
/// future was dropped mid-teardown: the record is removed with state `CLOSED`
/// and the id leaves the in-progress set.
struct ClosingGuard<'a> {
    closing: &'a Mutex<HashSet<ConnectionId>>,
    monitor: &'a ConnectionMonitor,
    connection: Connection,
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        let mut closed = self.connection.clone();
        closed.state = ConnectionState::Closed;
        let id = closed.id.clone();
        self.monitor.delete_with(closed);
        self.closing.lock().remove(&id);
    }
}
