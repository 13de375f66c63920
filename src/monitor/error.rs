// ABOUTME: Error types for connection table mutations.
// ABOUTME: Both variants indicate a caller bug rather than a user-facing failure.

use crate::types::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("connection {0} is already tracked")]
    DuplicateId(ConnectionId),

    #[error("connection {0} is not tracked")]
    NotFound(ConnectionId),
}
