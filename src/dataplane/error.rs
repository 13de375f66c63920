// ABOUTME: Error type for dataplane client operations.
// ABOUTME: Wraps agent failures and caller deadlines into one surface for the endpoint.

use std::time::Duration;

use super::agent::AgentError;

#[derive(Debug, thiserror::Error)]
pub enum DataplaneError {
    /// The agent call failed.
    #[error("dataplane agent error: {0}")]
    Agent(#[from] AgentError),

    /// The caller's deadline passed before the dataplane answered.
    #[error("dataplane {operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// The connection record cannot be turned into forwarding configuration.
    #[error("cannot program connection {0}")]
    InvalidConnection(String),

    /// Failure reported by a non-agent dataplane implementation.
    #[error("dataplane error: {0}")]
    Other(String),
}
