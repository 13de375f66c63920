// ABOUTME: Put/Del capability of the external dataplane agent, with SNAFU errors.
// ABOUTME: Both calls are retry-safe; the agent treats repeated changes as no-ops.

use async_trait::async_trait;
use snafu::Snafu;

use super::model::DataChange;

/// The two calls the control plane issues to the forwarding agent.
#[async_trait]
pub trait DataplaneAgent: Send + Sync {
    /// Apply a configuration change.
    async fn put(&self, change: &DataChange) -> Result<(), AgentError>;

    /// Remove a configuration change.
    async fn del(&self, change: &DataChange) -> Result<(), AgentError>;
}

/// Transport and protocol failures talking to the agent.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AgentError {
    #[snafu(display("cannot reach dataplane agent at {endpoint}: {source}"))]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[snafu(display("HTTP handshake with dataplane agent failed: {source}"))]
    Handshake { source: hyper::Error },

    #[snafu(display("failed to build agent request: {source}"))]
    BuildRequest { source: hyper::http::Error },

    #[snafu(display("agent request failed: {source}"))]
    Send { source: hyper::Error },

    #[snafu(display("failed to encode data change: {source}"))]
    Encode { source: serde_json::Error },

    #[snafu(display("agent rejected change with status {status}: {message}"))]
    Rejected { status: u16, message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// The agent could not be reached or the connection broke.
    Unreachable,
    /// The agent answered and refused the change.
    Rejected,
    /// The request never left this process.
    Local,
}

impl AgentError {
    pub fn kind(&self) -> AgentErrorKind {
        match self {
            AgentError::Connect { .. } | AgentError::Handshake { .. } | AgentError::Send { .. } => {
                AgentErrorKind::Unreachable
            }
            AgentError::Rejected { .. } => AgentErrorKind::Rejected,
            AgentError::BuildRequest { .. } | AgentError::Encode { .. } => AgentErrorKind::Local,
        }
    }
}
