use crate::error::ShipmentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a shipment.
///
/// The main path is `pending → picked_up → in_transit → out_for_delivery →
/// delivered`. `delayed` can interrupt any in-flight state and `cancelled`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Delayed,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 7] = [
        ShipmentStatus::Pending,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Delayed,
        ShipmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Delayed => "delayed",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    /// Picked up but not yet delivered.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::PickedUp | ShipmentStatus::InTransit | ShipmentStatus::OutForDelivery
        )
    }

    /// Customers may cancel until the parcel leaves the pickup stage.
    pub fn allows_customer_cancel(&self) -> bool {
        matches!(self, ShipmentStatus::Pending | ShipmentStatus::PickedUp)
    }

    /// Customers may edit only before pickup.
    pub fn allows_customer_edit(&self) -> bool {
        *self == ShipmentStatus::Pending
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ShipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| ShipmentError::ValidationError(format!("unknown status '{}'", s)))
    }
}

/// Which status changes staff are allowed to make through a status update.
///
/// `Permissive` trusts operational staff to pick a sensible next status and
/// accepts anything, including repeats. `Strict` enforces the transition
/// graph: no skipped states, no backward moves other than into `delayed`,
/// and nothing out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    pub fn permits(&self, from: ShipmentStatus, to: ShipmentStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => strict_transition(from, to),
        }
    }
}

fn strict_transition(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    use ShipmentStatus::*;

    if from.is_terminal() {
        return false;
    }
    if to == Delayed {
        return from.is_in_flight();
    }
    match from {
        Pending => matches!(to, PickedUp | Cancelled),
        PickedUp => matches!(to, InTransit | Cancelled),
        InTransit => to == OutForDelivery,
        OutForDelivery => to == Delivered,
        Delayed => matches!(to, InTransit | OutForDelivery | Delivered),
        Delivered | Cancelled => false,
    }
}
