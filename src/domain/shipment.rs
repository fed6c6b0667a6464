use super::ids::{ShipmentId, UserId};
use super::payment::{PaymentDetails, PaymentStatus, SettlementOutcome};
use super::rate::{Pricing, ServiceClass};
use super::status::{ShipmentStatus, TransitionPolicy};
use super::tracking::{Coordinates, TrackingEvent, TrackingLedger, TrackingSnapshot};
use super::tracking_number::TrackingNumber;
use crate::error::ShipmentError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const CREATED_DESCRIPTION: &str = "Shipment created and awaiting pickup";
pub const CANCELLED_DESCRIPTION: &str = "Shipment cancelled by customer";

/// Heaviest parcel accepted, in kilograms.
pub const MAX_WEIGHT_KG: Decimal = dec!(50000);
/// Longest side accepted, in centimetres.
pub const MAX_DIMENSION_CM: Decimal = dec!(10000);
pub const MAX_DECLARED_VALUE: Decimal = dec!(10000000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Kilograms.
    pub weight: Decimal,
    /// Centimetres.
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub description: String,
    pub declared_value: Decimal,
}

fn require(field: &str, value: &str) -> Result<(), ShipmentError> {
    if value.trim().is_empty() {
        return Err(ShipmentError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

impl Address {
    pub fn validate(&self, party: &str) -> Result<(), ShipmentError> {
        require(&format!("{} street", party), &self.street)?;
        require(&format!("{} city", party), &self.city)?;
        require(&format!("{} state", party), &self.state)?;
        require(&format!("{} postal code", party), &self.postal_code)?;
        require(&format!("{} country", party), &self.country)
    }
}

impl Contact {
    pub fn validate(&self, party: &str) -> Result<(), ShipmentError> {
        require(&format!("{} name", party), &self.name)?;
        require(&format!("{} phone", party), &self.phone)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(ShipmentError::ValidationError(format!(
                    "{} email '{}' is invalid",
                    party, self.email
                )));
            }
        }
        self.address.validate(party)
    }
}

/// Checks the two figures the rate engine prices on.
pub fn validate_priced_inputs(weight: Decimal, declared_value: Decimal) -> Result<(), ShipmentError> {
    if weight <= Decimal::ZERO || weight > MAX_WEIGHT_KG {
        return Err(ShipmentError::ValidationError(format!(
            "package weight must be positive and at most {} kg",
            MAX_WEIGHT_KG
        )));
    }
    if declared_value < Decimal::ZERO || declared_value > MAX_DECLARED_VALUE {
        return Err(ShipmentError::ValidationError(format!(
            "package declared value must be between 0 and {}",
            MAX_DECLARED_VALUE
        )));
    }
    Ok(())
}

impl Package {
    pub fn validate(&self) -> Result<(), ShipmentError> {
        validate_priced_inputs(self.weight, self.declared_value)?;
        for (field, value) in [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ] {
            if value <= Decimal::ZERO || value > MAX_DIMENSION_CM {
                return Err(ShipmentError::ValidationError(format!(
                    "package {} must be positive and at most {} cm",
                    field, MAX_DIMENSION_CM
                )));
            }
        }
        require("package description", &self.description)
    }
}

/// Everything a customer supplies to create a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShipment {
    pub sender: Contact,
    pub recipient: Contact,
    pub package: Package,
    pub service: ServiceClass,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewShipment {
    pub fn validate(&self) -> Result<(), ShipmentError> {
        self.sender.validate("sender")?;
        self.recipient.validate("recipient")?;
        self.package.validate()
    }
}

/// Partial update a customer may apply while the shipment is pending.
/// Absent fields are left untouched. Pricing is never recomputed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipmentEdit {
    #[serde(default)]
    pub sender: Option<Contact>,
    #[serde(default)]
    pub recipient: Option<Contact>,
    #[serde(default)]
    pub package: Option<Package>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ShipmentEdit {
    pub fn validate(&self) -> Result<(), ShipmentError> {
        if let Some(sender) = &self.sender {
            sender.validate("sender")?;
        }
        if let Some(recipient) = &self.recipient {
            recipient.validate("recipient")?;
        }
        if let Some(package) = &self.package {
            package.validate()?;
        }
        Ok(())
    }
}

/// A staff-issued status change together with its ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ShipmentStatus,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl StatusUpdate {
    pub fn new(status: ShipmentStatus, location: &str, description: &str) -> Self {
        Self {
            status,
            location: location.to_string(),
            description: description.to_string(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates { lat, lng });
        self
    }

    pub fn validate(&self) -> Result<(), ShipmentError> {
        require("location", &self.location)?;
        require("description", &self.description)?;
        if let Some(coordinates) = &self.coordinates {
            coordinates.validate()?;
        }
        Ok(())
    }
}

/// Aggregate root for one parcel's journey.
///
/// Fields are private so the lifecycle methods are the only way to change
/// status, and every status change goes through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    id: ShipmentId,
    tracking_number: TrackingNumber,
    owner: UserId,
    sender: Contact,
    recipient: Contact,
    package: Package,
    service: ServiceClass,
    pricing: Pricing,
    status: ShipmentStatus,
    tracking: TrackingLedger,
    agent: Option<UserId>,
    estimated_delivery: DateTime<Utc>,
    actual_delivery: Option<DateTime<Utc>>,
    payment: PaymentDetails,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Builds a shipment in `pending` with its opening ledger entry.
    pub fn create(
        tracking_number: TrackingNumber,
        owner: UserId,
        request: NewShipment,
        pricing: Pricing,
        estimated_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let opening = TrackingEvent {
            status: ShipmentStatus::Pending,
            location: request.sender.address.city.clone(),
            description: CREATED_DESCRIPTION.to_string(),
            timestamp: now,
            coordinates: None,
        };

        Self {
            id: ShipmentId::new(),
            tracking_number,
            owner,
            sender: request.sender,
            recipient: request.recipient,
            package: request.package,
            service: request.service,
            pricing,
            status: ShipmentStatus::Pending,
            tracking: TrackingLedger::open(opening),
            agent: None,
            estimated_delivery: now + Duration::days(i64::from(estimated_days)),
            actual_delivery: None,
            payment: PaymentDetails::default(),
            notes: request.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> ShipmentId {
        self.id
    }

    pub fn tracking_number(&self) -> &TrackingNumber {
        &self.tracking_number
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn sender(&self) -> &Contact {
        &self.sender
    }

    pub fn recipient(&self) -> &Contact {
        &self.recipient
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn service(&self) -> ServiceClass {
        self.service
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn tracking(&self) -> &TrackingLedger {
        &self.tracking
    }

    pub fn agent(&self) -> Option<UserId> {
        self.agent
    }

    pub fn estimated_delivery(&self) -> DateTime<Utc> {
        self.estimated_delivery
    }

    pub fn actual_delivery(&self) -> Option<DateTime<Utc>> {
        self.actual_delivery
    }

    pub fn payment(&self) -> &PaymentDetails {
        &self.payment
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Staff status change. Appends exactly one ledger event and, on the
    /// first transition to `delivered`, stamps the delivery time. A repeated
    /// `delivered` still appends an event but keeps the original stamp.
    pub fn advance(
        &mut self,
        update: StatusUpdate,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), ShipmentError> {
        update.validate()?;
        if !policy.permits(self.status, update.status) {
            return Err(ShipmentError::Precondition(format!(
                "Cannot move shipment from {} to {}",
                self.status, update.status
            )));
        }

        self.transition(
            update.status,
            update.location,
            update.description,
            update.coordinates,
            now,
        );
        if update.status == ShipmentStatus::Delivered && self.actual_delivery.is_none() {
            self.actual_delivery = Some(now);
        }
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ShipmentError> {
        if !self.status.allows_customer_cancel() {
            return Err(ShipmentError::Precondition(
                "Cannot cancel shipment at this stage".to_string(),
            ));
        }
        let location = self.sender.address.city.clone();
        self.transition(
            ShipmentStatus::Cancelled,
            location,
            CANCELLED_DESCRIPTION.to_string(),
            None,
            now,
        );
        Ok(())
    }

    /// Applies a customer edit. Never touches the ledger.
    pub fn apply_edit(&mut self, edit: ShipmentEdit, now: DateTime<Utc>) -> Result<(), ShipmentError> {
        if !self.status.allows_customer_edit() {
            return Err(ShipmentError::Precondition(
                "Cannot update shipment after pickup".to_string(),
            ));
        }
        edit.validate()?;

        if let Some(sender) = edit.sender {
            self.sender = sender;
        }
        if let Some(recipient) = edit.recipient {
            self.recipient = recipient;
        }
        if let Some(package) = edit.package {
            self.package = package;
        }
        if let Some(notes) = edit.notes {
            self.notes = Some(notes);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn assign_agent(&mut self, agent: UserId, now: DateTime<Utc>) {
        self.agent = Some(agent);
        self.updated_at = now;
    }

    /// Records the result of a settlement on the payment sub-record only.
    /// Shipment status is independent of payment status.
    pub fn record_settlement(
        &mut self,
        outcome: SettlementOutcome,
        method: &str,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ShipmentError> {
        if self.payment.status == PaymentStatus::Paid {
            return Err(ShipmentError::Precondition(format!(
                "Shipment {} is already paid",
                self.tracking_number
            )));
        }

        self.payment.method = Some(method.to_string());
        self.payment.transaction_id = Some(transaction_id.to_string());
        match outcome {
            SettlementOutcome::Succeeded => {
                self.payment.status = PaymentStatus::Paid;
                self.payment.paid_at = Some(now);
            }
            SettlementOutcome::Failed => {
                self.payment.status = PaymentStatus::Failed;
            }
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            tracking_number: self.tracking_number.clone(),
            status: self.status,
            service: self.service,
            origin: self.sender.address.city.clone(),
            destination: self.recipient.address.city.clone(),
            estimated_delivery: self.estimated_delivery,
            actual_delivery: self.actual_delivery,
            events: self.tracking.events().to_vec(),
        }
    }

    fn transition(
        &mut self,
        status: ShipmentStatus,
        location: String,
        description: String,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) {
        self.tracking.append(TrackingEvent {
            status,
            location,
            description,
            timestamp: now,
            coordinates,
        });
        self.status = status;
        self.updated_at = now;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn update(status: ShipmentStatus) -> StatusUpdate {
        StatusUpdate::new(status, "Chicago", "Moving along")
    }

    #[test]
    fn test_create_opens_ledger() {
        let owner = UserId::new();
        let shipment = shipment(owner);

        assert_eq!(shipment.status(), ShipmentStatus::Pending);
        assert_eq!(shipment.owner(), owner);
        assert_eq!(shipment.tracking().len(), 1);

        let first = shipment.tracking().first().unwrap();
        assert_eq!(first.status, ShipmentStatus::Pending);
        assert_eq!(first.location, "New York");
        assert_eq!(first.description, CREATED_DESCRIPTION);
        assert!(shipment.actual_delivery().is_none());
        assert_eq!(
            shipment.estimated_delivery() - shipment.created_at(),
            Duration::days(3)
        );
        assert_eq!(shipment.pricing().total, dec!(22.25));
    }

    #[test]
    fn test_advance_appends_in_order() {
        let mut shipment = shipment(UserId::new());
        let now = Utc::now();
        for status in [
            ShipmentStatus::PickedUp,
            ShipmentStatus::InTransit,
            ShipmentStatus::OutForDelivery,
        ] {
            shipment
                .advance(update(status), TransitionPolicy::Permissive, now)
                .unwrap();
        }
        let statuses: Vec<_> = shipment.tracking().events().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ShipmentStatus::Pending,
                ShipmentStatus::PickedUp,
                ShipmentStatus::InTransit,
                ShipmentStatus::OutForDelivery
            ]
        );
        assert_eq!(shipment.status(), ShipmentStatus::OutForDelivery);
        assert!(shipment.actual_delivery().is_none());
    }

    #[test]
    fn test_delivery_stamp_set_once() {
        let mut shipment = shipment(UserId::new());
        let first = Utc::now();
        let later = first + Duration::hours(2);

        shipment
            .advance(update(ShipmentStatus::Delivered), TransitionPolicy::Permissive, first)
            .unwrap();
        assert_eq!(shipment.actual_delivery(), Some(first));

        shipment
            .advance(update(ShipmentStatus::Delivered), TransitionPolicy::Permissive, later)
            .unwrap();
        assert_eq!(shipment.actual_delivery(), Some(first));
        assert_eq!(shipment.tracking().len(), 3);
    }

    #[test]
    fn test_invalid_update_leaves_shipment_untouched() {
        let mut shipment = shipment(UserId::new());
        let before = shipment.clone();

        let blank = StatusUpdate::new(ShipmentStatus::PickedUp, " ", "desc");
        assert!(matches!(
            shipment.advance(blank, TransitionPolicy::Permissive, Utc::now()),
            Err(ShipmentError::ValidationError(_))
        ));

        let skip = update(ShipmentStatus::Delivered);
        assert!(matches!(
            shipment.advance(skip, TransitionPolicy::Strict, Utc::now()),
            Err(ShipmentError::Precondition(_))
        ));
        assert_eq!(shipment, before);
    }

    #[test]
    fn test_cancel_windows() {
        for status in ShipmentStatus::ALL {
            let mut shipment = shipment(UserId::new());
            if status != ShipmentStatus::Pending {
                shipment
                    .advance(update(status), TransitionPolicy::Permissive, Utc::now())
                    .unwrap();
            }
            let events_before = shipment.tracking().len();
            let result = shipment.cancel(Utc::now());

            if status.allows_customer_cancel() {
                assert!(result.is_ok(), "{status} should cancel");
                assert_eq!(shipment.status(), ShipmentStatus::Cancelled);
                let last = shipment.tracking().latest().unwrap();
                assert_eq!(last.description, CANCELLED_DESCRIPTION);
                assert_eq!(last.location, "New York");
                assert_eq!(shipment.tracking().len(), events_before + 1);
            } else {
                assert!(matches!(result, Err(ShipmentError::Precondition(_))));
                assert_eq!(shipment.status(), status);
                assert_eq!(shipment.tracking().len(), events_before);
            }
        }
    }

    #[test]
    fn test_edit_only_while_pending() {
        let mut shipment = shipment(UserId::new());
        let edit = ShipmentEdit {
            recipient: Some(contact("Bob Stone", "Boston")),
            notes: Some("Leave at the door".to_string()),
            ..Default::default()
        };
        shipment.apply_edit(edit.clone(), Utc::now()).unwrap();
        assert_eq!(shipment.recipient().address.city, "Boston");
        assert_eq!(shipment.notes(), Some("Leave at the door"));
        assert_eq!(shipment.tracking().len(), 1);

        shipment
            .advance(update(ShipmentStatus::PickedUp), TransitionPolicy::Permissive, Utc::now())
            .unwrap();
        let before = shipment.clone();
        let err = shipment.apply_edit(edit, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot update shipment after pickup");
        assert_eq!(shipment, before);
    }

    #[test]
    fn test_edit_keeps_pricing() {
        let mut shipment = shipment(UserId::new());
        let pricing = shipment.pricing().clone();
        let edit = ShipmentEdit {
            package: Some(package(dec!(9.5), dec!(900))),
            ..Default::default()
        };
        shipment.apply_edit(edit, Utc::now()).unwrap();
        assert_eq!(shipment.package().weight, dec!(9.5));
        assert_eq!(shipment.pricing(), &pricing);
    }

    #[test]
    fn test_validation() {
        let mut request = new_shipment(ServiceClass::Express);
        assert!(request.validate().is_ok());

        request.sender.email = "not-an-email".to_string();
        assert!(matches!(
            request.validate(),
            Err(ShipmentError::ValidationError(_))
        ));

        let mut request = new_shipment(ServiceClass::Express);
        request.package.weight = dec!(0);
        assert!(request.validate().is_err());

        let mut request = new_shipment(ServiceClass::Express);
        request.recipient.address.postal_code = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_package_bounds() {
        let mut request = new_shipment(ServiceClass::Freight);
        request.package.weight = MAX_WEIGHT_KG;
        request.package.declared_value = MAX_DECLARED_VALUE;
        assert!(request.validate().is_ok());

        request.package.weight = MAX_WEIGHT_KG + dec!(0.001);
        assert!(matches!(
            request.validate(),
            Err(ShipmentError::ValidationError(_))
        ));

        let mut request = new_shipment(ServiceClass::Freight);
        request.package.weight = Decimal::MAX;
        assert!(request.validate().is_err());

        let mut request = new_shipment(ServiceClass::Freight);
        request.package.declared_value = MAX_DECLARED_VALUE + dec!(0.01);
        assert!(request.validate().is_err());

        let mut request = new_shipment(ServiceClass::Freight);
        request.package.height = Decimal::MAX;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_settlement_touches_payment_only() {
        let mut shipment = shipment(UserId::new());
        let now = Utc::now();
        shipment
            .record_settlement(SettlementOutcome::Failed, "card", "pi_1", now)
            .unwrap();
        assert_eq!(shipment.payment().status, PaymentStatus::Failed);
        assert!(shipment.payment().paid_at.is_none());

        shipment
            .record_settlement(SettlementOutcome::Succeeded, "card", "pi_2", now)
            .unwrap();
        assert_eq!(shipment.payment().status, PaymentStatus::Paid);
        assert_eq!(shipment.payment().transaction_id.as_deref(), Some("pi_2"));
        assert_eq!(shipment.payment().paid_at, Some(now));
        assert_eq!(shipment.status(), ShipmentStatus::Pending);
        assert_eq!(shipment.tracking().len(), 1);

        assert!(
            shipment
                .record_settlement(SettlementOutcome::Succeeded, "card", "pi_3", now)
                .is_err()
        );
    }

    #[test]
    fn test_snapshot() {
        let shipment = shipment(UserId::new());
        let snapshot = shipment.snapshot();
        assert_eq!(snapshot.origin, "New York");
        assert_eq!(snapshot.destination, "Los Angeles");
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(&snapshot.tracking_number, shipment.tracking_number());
    }

    #[test]
    fn test_serde_round_trip_preserves_ledger() {
        let mut shipment = shipment(UserId::new());
        shipment
            .advance(
                update(ShipmentStatus::PickedUp).with_coordinates(41.5, -87.25),
                TransitionPolicy::Permissive,
                Utc::now(),
            )
            .unwrap();
        let json = serde_json::to_vec(&shipment).unwrap();
        let restored: Shipment = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored, shipment);
    }
}
