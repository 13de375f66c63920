// ABOUTME: Dataplane boundary: the capability the endpoint programs connections through.
// ABOUTME: Agent Put/Del trait, data-change model, agent-backed client and HTTP transport.

mod agent;
mod client;
mod error;
mod http;
mod model;

pub use agent::{AgentError, AgentErrorKind, DataplaneAgent};
pub use client::{AgentDataplane, Dataplane, DataplaneSettings};
pub use error::DataplaneError;
pub use http::HttpAgent;
pub use model::{BridgeDomain, BridgeDomainTemplate, DataChange, Interface, InterfaceKind, interface_id};
