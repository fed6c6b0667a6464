use crate::domain::payment::{PaymentIntent, SettlementIntentRequest};
use crate::domain::ports::PaymentGateway;
use crate::error::{Result, ShipmentError};
use async_trait::async_trait;
use uuid::Uuid;

/// Stand-in payment gateway that issues intents locally.
///
/// Used by the CLI and tests; a production deployment plugs a real gateway
/// client in behind the same [`PaymentGateway`] port.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    unavailable: bool,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every call fails, for exercising upstream errors.
    pub fn unavailable() -> Self {
        Self { unavailable: true }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_intent(&self, request: SettlementIntentRequest) -> Result<PaymentIntent> {
        if self.unavailable {
            return Err(ShipmentError::GatewayError(
                "payment gateway unavailable".to_string(),
            ));
        }
        if request.amount_minor <= 0 {
            return Err(ShipmentError::GatewayError(format!(
                "invalid amount {}",
                request.amount_minor
            )));
        }

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{}_secret_{}", id, Uuid::new_v4().simple());
        tracing::debug!(
            intent_id = %id,
            shipment_id = %request.metadata.shipment_id,
            amount_minor = request.amount_minor,
            "settlement intent issued"
        );
        Ok(PaymentIntent {
            id,
            client_secret,
            amount_minor: request.amount_minor,
            currency: request.currency.to_lowercase(),
        })
    }

    fn method(&self) -> &str {
        "card"
    }
}
