// ABOUTME: Library root for nsendpoint.
// ABOUTME: Exports connection negotiation, dataplane programming and monitoring modules.

pub mod address;
pub mod config;
pub mod connection;
pub mod dataplane;
pub mod endpoint;
pub mod error;
pub mod mechanism;
pub mod monitor;
pub mod output;
pub mod types;
