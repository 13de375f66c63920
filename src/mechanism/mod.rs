// ABOUTME: Mechanism model: types, parameter vocabulary, schemas and negotiation.
// ABOUTME: Pure data and validation; the only I/O is reading the local netns inode.

mod error;
pub mod keys;
mod negotiate;
mod netns;
mod schema;

pub use error::MechanismError;
pub use negotiate::{NegotiationContext, Negotiated, negotiate};
pub use netns::current_netns_inode;
pub use schema::{MechanismConfig, MechanismSchema, MechanismType, MemifRole, validate};
