use super::ids::{PaymentId, ShipmentId, UserId};
use crate::error::ShipmentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Payment state as seen from the shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment sub-record embedded in a shipment. Only a settlement
/// confirmation mutates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// State of a settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// One settlement attempt against the payment gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub shipment_id: ShipmentId,
    pub amount: Decimal,
    pub currency: String,
    pub state: SettlementState,
    pub method: String,
    pub intent_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        user_id: UserId,
        shipment_id: ShipmentId,
        amount: Decimal,
        currency: &str,
        intent: &PaymentIntent,
        method: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            user_id,
            shipment_id,
            amount,
            currency: currency.to_string(),
            state: SettlementState::Pending,
            method: method.to_string(),
            intent_id: intent.id.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves a pending payment to its final state. Settling twice is
    /// rejected so a replayed confirmation cannot flip a completed payment.
    pub fn settle(
        &mut self,
        outcome: SettlementOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), ShipmentError> {
        if self.state != SettlementState::Pending {
            return Err(ShipmentError::Precondition(format!(
                "Payment {} already settled",
                self.intent_id
            )));
        }
        self.state = match outcome {
            SettlementOutcome::Succeeded => SettlementState::Completed,
            SettlementOutcome::Failed => SettlementState::Failed,
        };
        self.updated_at = now;
        Ok(())
    }

    /// Returns a settled payment to pending. Used when the settlement could
    /// not be recorded on the shipment.
    pub fn reopen(&mut self, now: DateTime<Utc>) -> Result<(), ShipmentError> {
        if self.state == SettlementState::Pending {
            return Err(ShipmentError::Precondition(format!(
                "Payment {} is not settled",
                self.intent_id
            )));
        }
        self.state = SettlementState::Pending;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementMetadata {
    pub shipment_id: ShipmentId,
    pub user_id: UserId,
}

/// What the core asks the gateway to collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementIntentRequest {
    /// Amount in the currency's minor unit (cents).
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: SettlementMetadata,
}

/// Intent issued by the gateway; the client secret goes back to the
/// customer to complete payment out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Succeeded,
    Failed,
}

/// Event delivered by the gateway once a settlement finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfirmation {
    pub intent_id: String,
    pub outcome: SettlementOutcome,
    /// External transaction reference recorded on the shipment.
    pub transaction_id: String,
}

pub fn to_minor_units(amount: Decimal) -> Result<i64, ShipmentError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.round().to_i64())
        .ok_or_else(|| ShipmentError::ValidationError(format!("amount {} out of range", amount)))
}
