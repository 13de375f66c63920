// ABOUTME: Subscriber side of the connection monitor.
// ABOUTME: A Stream of events that unregisters itself when dropped.

use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::ConnectionEvent;

use super::table::{Inner, SubscriberId};

/// Live connection events for one subscriber.
///
/// The stream ends when the monitor disconnects the subscriber for falling
/// behind or when the monitor itself is dropped. Dropping the subscription
/// releases its queue and registry slot immediately.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<ConnectionEvent>,
    monitor: Weak<Mutex<Inner>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub(super) fn new(
        id: SubscriberId,
        rx: mpsc::Receiver<ConnectionEvent>,
        monitor: Weak<Mutex<Inner>>,
    ) -> Self {
        Self { id, rx, monitor }
    }

    /// Wait for the next event. `None` means the stream is over.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = ConnectionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.monitor.upgrade() {
            inner.lock().unsubscribe(self.id);
        }
    }
}
