// ABOUTME: Mechanism negotiation against a requester's ordered preference list.
// ABOUTME: Picks the first supported type, fills in responder-owned keys, validates.

use std::collections::BTreeMap;
use std::path::Path;

use crate::connection::{Mechanism, MechanismPreference};
use crate::types::{ConnectionId, NetworkServiceName};

use super::error::MechanismError;
use super::keys;
use super::schema::{MechanismConfig, MechanismType, validate};

/// Memif control socket file name inside a connection's directory.
const MEMIF_SOCKET: &str = "memif.sock";

/// Responder-side facts used to synthesize parameters the requester left out.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationContext<'a> {
    /// Mechanisms this endpoint can realize.
    pub supported: &'a [MechanismType],
    /// Default base directory for socket files.
    pub workspace: &'a Path,
    /// Network namespace inode of the responder, if known.
    pub netns_inode: Option<u64>,
    pub network_service: &'a NetworkServiceName,
    pub connection_id: &'a ConnectionId,
    /// Per-connection sequence number, used to derive a VXLAN VNI.
    pub sequence: u64,
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// Wire form, stored on the connection.
    pub mechanism: Mechanism,
    /// Typed form, used to program the dataplane.
    pub config: MechanismConfig,
}

/// Negotiate a mechanism for one connection.
///
/// Walks `preferences` in order and selects the first type listed in
/// `ctx.supported`. Parameters are taken from the preference itself, then
/// from `hints` for keys the schema knows, then synthesized locally.
///
/// # Errors
///
/// `MechanismError::Unsupported` if no preference is supported, otherwise
/// whatever `validate` reports for the completed parameter set.
pub fn negotiate(
    preferences: &[MechanismPreference],
    hints: &BTreeMap<String, String>,
    ctx: &NegotiationContext<'_>,
) -> Result<Negotiated, MechanismError> {
    let (mechanism_type, preference) = preferences
        .iter()
        .find_map(|p| {
            p.mechanism_type
                .parse::<MechanismType>()
                .ok()
                .filter(|t| ctx.supported.contains(t))
                .map(|t| (t, p))
        })
        .ok_or_else(|| MechanismError::Unsupported {
            requested: preferences
                .iter()
                .map(|p| p.mechanism_type.clone())
                .collect(),
        })?;

    let schema = mechanism_type.schema();
    let mut parameters = preference.parameters.clone();
    for (key, value) in hints {
        if schema.knows(key) {
            parameters
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    synthesize(mechanism_type, &mut parameters, ctx);
    tracing::debug!(
        mechanism = %mechanism_type,
        connection = %ctx.connection_id,
        "negotiated mechanism parameters: {:?}",
        parameters
    );

    let config = validate(mechanism_type, &parameters)?;
    Ok(Negotiated {
        mechanism: Mechanism {
            mechanism_type,
            parameters,
        },
        config,
    })
}

fn synthesize(
    mechanism_type: MechanismType,
    parameters: &mut BTreeMap<String, String>,
    ctx: &NegotiationContext<'_>,
) {
    match mechanism_type {
        MechanismType::Memif => {
            fill_netns(parameters, ctx);
            if absent(parameters, keys::SOCKET_FILENAME) {
                let workspace = parameters
                    .get(keys::WORKSPACE)
                    .filter(|w| !w.trim().is_empty())
                    .map(|w| Path::new(w.trim()).to_path_buf())
                    .unwrap_or_else(|| ctx.workspace.to_path_buf());
                let socket = workspace
                    .join(ctx.network_service.as_str())
                    .join(ctx.connection_id.as_str())
                    .join(MEMIF_SOCKET);
                parameters.insert(
                    keys::SOCKET_FILENAME.to_string(),
                    socket.to_string_lossy().into_owned(),
                );
            }
            // The responder creates the socket, so it defaults to master.
            if !parameters.contains_key(keys::MASTER) && !parameters.contains_key(keys::SLAVE) {
                parameters.insert(keys::MASTER.to_string(), "true".to_string());
            }
        }
        MechanismType::Kernel => fill_netns(parameters, ctx),
        MechanismType::Vxlan => {
            if absent(parameters, keys::VNI) {
                let vni = (ctx.sequence % 0x00ff_ffff) + 1;
                parameters.insert(keys::VNI.to_string(), vni.to_string());
            }
        }
    }
}

fn fill_netns(parameters: &mut BTreeMap<String, String>, ctx: &NegotiationContext<'_>) {
    if absent(parameters, keys::NETNS_INODE)
        && let Some(inode) = ctx.netns_inode
    {
        parameters.insert(keys::NETNS_INODE.to_string(), inode.to_string());
    }
}

fn absent(parameters: &BTreeMap<String, String>, key: &str) -> bool {
    parameters.get(key).is_none_or(|v| v.trim().is_empty())
}
