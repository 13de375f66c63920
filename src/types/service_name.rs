// ABOUTME: DNS-compatible network service name validation.
// ABOUTME: Ensures service names follow RFC 1123 label requirements.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkServiceNameError {
    #[error("network service name cannot be empty")]
    Empty,

    #[error("network service name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("network service name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("network service name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("network service name must be lowercase")]
    NotLowercase,

    #[error("invalid character in network service name: '{0}'")]
    InvalidChar(char),
}

/// Name of a network service a consumer asks to be connected to.
///
/// Also names the bridge domain the service's connections are attached to,
/// so it has to be a valid RFC 1123 label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkServiceName(String);

impl NetworkServiceName {
    pub fn new(value: &str) -> Result<Self, NetworkServiceNameError> {
        if value.is_empty() {
            return Err(NetworkServiceNameError::Empty);
        }

        if value.len() > 63 {
            return Err(NetworkServiceNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(NetworkServiceNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(NetworkServiceNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(NetworkServiceNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(NetworkServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NetworkServiceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NetworkServiceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_label() {
        let name = NetworkServiceName::new("icmp-responder").unwrap();
        assert_eq!(name.as_str(), "icmp-responder");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            NetworkServiceName::new(""),
            Err(NetworkServiceNameError::Empty)
        );
    }

    #[test]
    fn rejects_uppercase_and_symbols() {
        assert_eq!(
            NetworkServiceName::new("Icmp"),
            Err(NetworkServiceNameError::NotLowercase)
        );
        assert_eq!(
            NetworkServiceName::new("icmp_responder"),
            Err(NetworkServiceNameError::InvalidChar('_'))
        );
    }

    #[test]
    fn rejects_edge_hyphens() {
        assert_eq!(
            NetworkServiceName::new("-a"),
            Err(NetworkServiceNameError::StartsWithHyphen)
        );
        assert_eq!(
            NetworkServiceName::new("a-"),
            Err(NetworkServiceNameError::EndsWithHyphen)
        );
    }
}
