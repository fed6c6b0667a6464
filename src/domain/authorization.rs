//! Permission predicates gating every lifecycle operation.
//!
//! Each [`Capability`] maps to exactly one predicate over the caller and,
//! where relevant, the shipment owner. Resource existence is checked by the
//! caller of [`authorize`] first, so a missing shipment is reported as not
//! found even to its would-be owner.

use super::ids::UserId;
use crate::error::ShipmentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Agent,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Agent, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ShipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == needle)
            .ok_or_else(|| ShipmentError::ValidationError(format!("unknown role '{}'", s)))
    }
}

/// An already-authenticated identity, as supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn agent(user_id: UserId) -> Self {
        Self::new(user_id, Role::Agent)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadShipment,
    EditShipment,
    CancelShipment,
    AdvanceStatus,
    AssignAgent,
    SearchShipments,
    RequestPayment,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ReadShipment,
        Capability::EditShipment,
        Capability::CancelShipment,
        Capability::AdvanceStatus,
        Capability::AssignAgent,
        Capability::SearchShipments,
        Capability::RequestPayment,
    ];

    /// `owner` is the owner of the shipment the operation targets, or
    /// `None` for operations that do not target one.
    pub fn permits(self, caller: &Caller, owner: Option<UserId>) -> bool {
        match self {
            Capability::ReadShipment => can_read(caller, owner),
            Capability::EditShipment => can_edit(caller, owner),
            Capability::CancelShipment => can_cancel(caller, owner),
            Capability::AdvanceStatus => can_advance_status(caller),
            Capability::AssignAgent => can_assign_agent(caller),
            Capability::SearchShipments => can_search(caller),
            Capability::RequestPayment => can_request_payment(caller, owner),
        }
    }

    fn action(self) -> &'static str {
        match self {
            Capability::ReadShipment => "read this shipment",
            Capability::EditShipment => "edit this shipment",
            Capability::CancelShipment => "cancel this shipment",
            Capability::AdvanceStatus => "update shipment status",
            Capability::AssignAgent => "assign agents",
            Capability::SearchShipments => "search all shipments",
            Capability::RequestPayment => "pay for this shipment",
        }
    }
}

fn is_owner(caller: &Caller, owner: Option<UserId>) -> bool {
    owner == Some(caller.user_id)
}

fn is_staff(caller: &Caller) -> bool {
    matches!(caller.role, Role::Admin | Role::Agent)
}

pub fn can_read(caller: &Caller, owner: Option<UserId>) -> bool {
    is_owner(caller, owner) || caller.role == Role::Admin
}

/// Admins do not bypass ownership here; staff change shipments through
/// status updates instead.
pub fn can_edit(caller: &Caller, owner: Option<UserId>) -> bool {
    is_owner(caller, owner)
}

pub fn can_cancel(caller: &Caller, owner: Option<UserId>) -> bool {
    is_owner(caller, owner)
}

pub fn can_advance_status(caller: &Caller) -> bool {
    is_staff(caller)
}

pub fn can_assign_agent(caller: &Caller) -> bool {
    caller.role == Role::Admin
}

pub fn can_search(caller: &Caller) -> bool {
    caller.role == Role::Admin
}

pub fn can_request_payment(caller: &Caller, owner: Option<UserId>) -> bool {
    is_owner(caller, owner)
}

pub fn authorize(
    caller: &Caller,
    capability: Capability,
    owner: Option<UserId>,
) -> Result<(), ShipmentError> {
    if capability.permits(caller, owner) {
        Ok(())
    } else {
        Err(ShipmentError::NotAuthorized(format!(
            "{} {} may not {}",
            caller.role,
            caller.user_id,
            capability.action()
        )))
    }
}
