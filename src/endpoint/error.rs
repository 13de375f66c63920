// ABOUTME: Error types returned by the Request RPC.
// ABOUTME: Each variant maps to a kind for callers that branch on failure class.

use crate::address::AllocationError;
use crate::dataplane::DataplaneError;
use crate::mechanism::MechanismError;
use crate::types::NetworkServiceNameError;

/// Errors that can occur while establishing a connection.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Malformed request.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Mechanism negotiation failed.
    #[error(transparent)]
    Mechanism(#[from] MechanismError),

    /// Address pool exhausted.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Bridge domain or interface programming failed or timed out.
    #[error(transparent)]
    Dataplane(#[from] DataplaneError),

    /// An internal invariant was broken.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    Validation,
    UnsupportedMechanism,
    MissingParameter,
    InvalidParameter,
    Allocation,
    Dataplane,
    Internal,
}

impl RequestError {
    pub fn kind(&self) -> RequestErrorKind {
        match self {
            RequestError::Validation(_) => RequestErrorKind::Validation,
            RequestError::Mechanism(MechanismError::Unsupported { .. }) => {
                RequestErrorKind::UnsupportedMechanism
            }
            RequestError::Mechanism(MechanismError::MissingParameter { .. }) => {
                RequestErrorKind::MissingParameter
            }
            RequestError::Mechanism(MechanismError::InvalidParameter { .. }) => {
                RequestErrorKind::InvalidParameter
            }
            RequestError::Allocation(_) => RequestErrorKind::Allocation,
            RequestError::Dataplane(_) => RequestErrorKind::Dataplane,
            RequestError::Internal(_) => RequestErrorKind::Internal,
        }
    }

    /// The missing parameter key, if negotiation failed on one.
    pub fn missing_parameter(&self) -> Option<&str> {
        match self {
            RequestError::Mechanism(MechanismError::MissingParameter { key }) => Some(key),
            _ => None,
        }
    }
}

impl From<NetworkServiceNameError> for RequestError {
    fn from(err: NetworkServiceNameError) -> Self {
        RequestError::Validation(err.to_string())
    }
}
