// ABOUTME: Request handler driving connections from request to active and back to closed.
// ABOUTME: Type-state setup pipeline, per-service bridge domain locks and the RPC surface.

mod bridge;
mod error;
mod service;
mod settings;
mod setup;
mod state;
mod transitions;

pub use error::{RequestError, RequestErrorKind};
pub use service::Endpoint;
pub use settings::EndpointSettings;
pub use setup::ConnectionSetup;
pub use state::{Addressed, Negotiated, Programmed, Requested};
