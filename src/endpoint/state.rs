// ABOUTME: Connection setup state markers for the type state pattern.
// ABOUTME: Each state carries exactly the data the next transition needs.

use crate::address::AddressPair;
use crate::connection::{Connection, MechanismPreference};
use crate::mechanism;

/// Request accepted and validated.
/// Available actions: `negotiate()`
#[derive(Debug, Clone)]
pub struct Requested {
    pub(crate) preferences: Vec<MechanismPreference>,
}

/// Mechanism chosen and parameters validated.
/// Available actions: `allocate()`
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub(crate) negotiated: mechanism::Negotiated,
}

/// Addresses allocated.
/// Available actions: `program()`
#[derive(Debug, Clone)]
pub struct Addressed {
    pub(crate) negotiated: mechanism::Negotiated,
    pub(crate) addresses: AddressPair,
}

/// Dataplane programmed; the record is still REQUESTED.
/// Available actions: `activate()`
#[derive(Debug, Clone)]
pub struct Programmed {
    pub(crate) connection: Connection,
}
