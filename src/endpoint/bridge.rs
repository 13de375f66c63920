// ABOUTME: Per-network-service guard around bridge domain creation.
// ABOUTME: One async lock per bridge domain name, so unrelated services never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::dataplane::{Dataplane, DataplaneError};

use super::transitions::within_deadline;

/// Tracks which bridge domains this endpoint has created.
///
/// The outer map lock is held only to find a name's slot; the creation call
/// runs under that name's own lock. A failed creation leaves the slot unset
/// so the next request retries it.
#[derive(Debug, Default)]
pub(crate) struct BridgeDomains {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<bool>>>>,
}

impl BridgeDomains {
    pub(crate) async fn ensure<D: Dataplane + ?Sized>(
        &self,
        dataplane: &D,
        name: &str,
        deadline: Instant,
    ) -> Result<(), DataplaneError> {
        let slot = self
            .slots
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();

        let started = Instant::now();
        let mut created = match tokio::time::timeout_at(deadline, slot.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                return Err(DataplaneError::Timeout {
                    operation: "wait for bridge domain",
                    elapsed: started.elapsed(),
                });
            }
        };
        if *created {
            return Ok(());
        }

        within_deadline(
            "ensure bridge domain",
            deadline,
            dataplane.ensure_bridge_domain(name),
        )
        .await?;
        *created = true;
        Ok(())
    }

    pub(crate) fn is_created(&self, name: &str) -> bool {
        self.slots
            .lock()
            .get(name)
            .and_then(|slot| slot.try_lock().ok().map(|created| *created))
            .unwrap_or(false)
    }
}
