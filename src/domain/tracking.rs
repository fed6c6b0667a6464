use super::rate::ServiceClass;
use super::status::ShipmentStatus;
use super::tracking_number::TrackingNumber;
use crate::error::ShipmentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<(), ShipmentError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(ShipmentError::ValidationError(format!(
                "coordinates out of range: ({}, {})",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// One entry of a shipment's tracking ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: ShipmentStatus,
    pub location: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Append-only, creation-ordered log of status events for one shipment.
///
/// There is no way to edit or remove an entry. The ledger is never empty
/// once the shipment exists: the first entry is the `pending` creation
/// event. Stored ledgers that break this are rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TrackingEvent>", into = "Vec<TrackingEvent>")]
pub struct TrackingLedger {
    events: Vec<TrackingEvent>,
}

impl TryFrom<Vec<TrackingEvent>> for TrackingLedger {
    type Error = ShipmentError;

    fn try_from(events: Vec<TrackingEvent>) -> Result<Self, Self::Error> {
        match events.first() {
            None => Err(ShipmentError::ValidationError(
                "tracking ledger is empty".to_string(),
            )),
            Some(first) if first.status != ShipmentStatus::Pending => {
                Err(ShipmentError::ValidationError(format!(
                    "tracking ledger starts with '{}' instead of pending",
                    first.status
                )))
            }
            Some(_) => Ok(Self { events }),
        }
    }
}

impl From<TrackingLedger> for Vec<TrackingEvent> {
    fn from(ledger: TrackingLedger) -> Self {
        ledger.events
    }
}

impl TrackingLedger {
    pub(crate) fn open(first: TrackingEvent) -> Self {
        Self {
            events: vec![first],
        }
    }

    pub(crate) fn append(&mut self, event: TrackingEvent) {
        self.events.push(event);
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&TrackingEvent> {
        self.events.first()
    }

    pub fn latest(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }

    /// Display order for timelines.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &TrackingEvent> {
        self.events.iter().rev()
    }
}

/// Public view returned by a tracking-number lookup. Carries no contact
/// details beyond the origin and destination cities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub tracking_number: TrackingNumber,
    pub status: ShipmentStatus,
    pub service: ServiceClass,
    pub origin: String,
    pub destination: String,
    pub estimated_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub events: Vec<TrackingEvent>,
}
