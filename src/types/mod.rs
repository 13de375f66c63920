// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep connection and interface IDs apart.

mod id;
mod service_name;

pub use id::{ConnectionId, Id, InterfaceId};
pub use service_name::{NetworkServiceName, NetworkServiceNameError};
