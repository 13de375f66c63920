// ABOUTME: Error types for mechanism validation and negotiation.
// ABOUTME: Missing keys carry the exact wire key so callers can report it verbatim.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MechanismError {
    /// None of the requested mechanisms is supported by this endpoint.
    #[error("no supported mechanism in preferences {requested:?}")]
    Unsupported { requested: Vec<String> },

    /// A required parameter is absent and could not be synthesized.
    #[error("missing mechanism parameter: {key}")]
    MissingParameter { key: String },

    /// A parameter is present but its value is unusable.
    #[error("invalid mechanism parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },
}

impl MechanismError {
    pub(crate) fn missing(key: &str) -> Self {
        MechanismError::MissingParameter {
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        MechanismError::InvalidParameter {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
