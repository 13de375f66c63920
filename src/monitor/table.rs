// ABOUTME: The connection table and subscriber registry behind one lock.
// ABOUTME: Mutations fan out with try_send so the writer never waits on a subscriber.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::connection::{Connection, ConnectionEvent};
use crate::types::ConnectionId;

use super::error::MonitorError;
use super::subscription::Subscription;

/// Per-subscriber queue depth used when none is configured.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

pub(super) type SubscriberId = u64;

#[derive(Debug, Default)]
pub(super) struct Inner {
    connections: BTreeMap<ConnectionId, Connection>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<ConnectionEvent>>,
    next_subscriber: SubscriberId,
}

impl Inner {
    /// Deliver `event` to every subscriber, disconnecting the ones whose
    /// queue is full or whose receiver is gone.
    fn broadcast(&mut self, event: &ConnectionEvent) {
        self.subscribers
            .retain(|id, tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = id, "Monitor subscriber fell behind, disconnecting");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = id, "Monitor subscriber gone");
                    false
                }
            });
    }

    pub(super) fn unsubscribe(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = id, "Monitor subscriber removed");
        }
    }
}

/// Owner of the authoritative connection table.
///
/// Cloning yields another handle to the same table. Every mutation and every
/// new subscription happens under one lock, which gives each subscriber a
/// snapshot followed by exactly the deltas applied after it.
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    inner: Arc<Mutex<Inner>>,
    queue_depth: usize,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

impl ConnectionMonitor {
    /// Create a monitor whose subscribers buffer at most `queue_depth` events.
    /// A depth of zero is raised to one so the initial snapshot always fits.
    pub fn new(queue_depth: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Insert a new connection and publish an UPDATE.
    pub fn add(&self, connection: Connection) -> Result<(), MonitorError> {
        let mut inner = self.inner.lock();
        if inner.connections.contains_key(&connection.id) {
            return Err(MonitorError::DuplicateId(connection.id));
        }
        inner
            .connections
            .insert(connection.id.clone(), connection.clone());
        inner.broadcast(&ConnectionEvent::update(connection));
        Ok(())
    }

    /// Replace an existing connection and publish an UPDATE.
    pub fn update(&self, connection: Connection) -> Result<(), MonitorError> {
        let mut inner = self.inner.lock();
        match inner.connections.get_mut(&connection.id) {
            Some(slot) => *slot = connection.clone(),
            None => return Err(MonitorError::NotFound(connection.id)),
        }
        inner.broadcast(&ConnectionEvent::update(connection));
        Ok(())
    }

    /// Remove a connection and publish a DELETE carrying its last state.
    ///
    /// Removing an unknown id is a no-op and publishes nothing. Returns the
    /// removed connection, if any.
    pub fn delete(&self, id: &ConnectionId) -> Option<Connection> {
        let mut inner = self.inner.lock();
        let removed = inner.connections.remove(id)?;
        inner.broadcast(&ConnectionEvent::delete(removed.clone()));
        Some(removed)
    }

    /// Remove `connection.id`, publishing `connection` as the final state.
    pub fn delete_with(&self, connection: Connection) -> bool {
        let mut inner = self.inner.lock();
        if inner.connections.remove(&connection.id).is_none() {
            return false;
        }
        inner.broadcast(&ConnectionEvent::delete(connection));
        true
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Connection> {
        self.inner.lock().connections.get(id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<ConnectionId, Connection> {
        self.inner.lock().connections.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Open a stream that starts with one INITIAL event holding the current
    /// table, followed by every later UPDATE/DELETE in application order.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let mut inner = self.inner.lock();

        let initial = ConnectionEvent::initial(inner.connections.clone());
        // The channel is empty and has capacity >= 1, so this cannot fail.
        let _ = tx.try_send(initial);

        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.insert(id, tx);
        drop(inner);

        tracing::debug!(subscriber = id, "Monitor subscriber added");
        Subscription::new(id, rx, Arc::downgrade(&self.inner))
    }
}
