use crate::config::ServiceConfig;
use crate::domain::authorization::{Caller, Capability, authorize};
use crate::domain::ids::{ShipmentId, UserId};
use crate::domain::payment::{
    Payment, PaymentIntent, PaymentStatus, SettlementConfirmation, SettlementIntentRequest,
    SettlementMetadata, to_minor_units,
};
use crate::domain::ports::{PaymentGatewayBox, PaymentStoreBox, ShipmentStoreBox};
use crate::domain::query::{Page, PageRequest, ShipmentQuery};
use crate::domain::rate::{Quote, ServiceClass, ServiceInfo, TransitEstimate};
use crate::domain::shipment::{
    NewShipment, Shipment, ShipmentEdit, StatusUpdate, validate_priced_inputs,
};
use crate::domain::status::ShipmentStatus;
use crate::domain::tracking::TrackingSnapshot;
use crate::domain::tracking_number::{
    RandomTrackingNumbers, TrackingNumber, TrackingNumberGenerator,
};
use crate::error::{Result, ShipmentError};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

/// Admin search parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentSearch {
    pub status: Option<ShipmentStatus>,
    pub tracking_number_contains: Option<String>,
    pub page: Option<PageRequest>,
}

/// Entry point for every shipment operation.
///
/// `ShipmentService` owns the storage backends and the payment gateway. Each
/// mutating operation runs as a single atomic update of one shipment
/// document: the authorization check, the state precondition and the
/// ledger append all happen inside the store's read-modify-write, so a
/// failed check never leaves a partial write behind.
pub struct ShipmentService {
    shipments: ShipmentStoreBox,
    payments: PaymentStoreBox,
    gateway: PaymentGatewayBox,
    tracking_numbers: Box<dyn TrackingNumberGenerator>,
    config: ServiceConfig,
}

impl ShipmentService {
    /// Creates a new `ShipmentService`.
    ///
    /// # Arguments
    ///
    /// * `shipments` - The store for shipment documents.
    /// * `payments` - The store for settlement attempts.
    /// * `gateway` - The payment gateway issuing settlement intents.
    /// * `config` - Validated runtime settings.
    pub fn new(
        shipments: ShipmentStoreBox,
        payments: PaymentStoreBox,
        gateway: PaymentGatewayBox,
        config: ServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let tracking_numbers = Box::new(RandomTrackingNumbers::new(&config.tracking_prefix)?);
        Ok(Self {
            shipments,
            payments,
            gateway,
            tracking_numbers,
            config,
        })
    }

    /// Replaces the tracking-number source.
    pub fn with_tracking_numbers(mut self, generator: Box<dyn TrackingNumberGenerator>) -> Self {
        self.tracking_numbers = generator;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Prices a parcel without persisting anything. Unknown service names
    /// are quoted as standard; weights and values outside the accepted
    /// package range are a validation error.
    pub fn quote(&self, weight: Decimal, service: &str, declared_value: Decimal) -> Result<Quote> {
        validate_priced_inputs(weight, declared_value)?;
        let quote = self.config.rates.quote_named(weight, service, declared_value)?;
        debug!(service = %quote.service, %weight, total = %quote.total, "quoted");
        Ok(quote)
    }

    pub fn services(&self) -> Vec<ServiceInfo> {
        self.config.rates.services()
    }

    pub fn transit_time(&self, service: &str) -> TransitEstimate {
        self.config
            .rates
            .transit_time(ServiceClass::from_name_or_standard(service), Utc::now())
    }

    /// Prices and persists a new shipment owned by the caller.
    ///
    /// Tracking-number collisions are retried with a fresh number up to
    /// `max_tracking_number_attempts` times and never reach the caller.
    pub async fn create_shipment(&self, caller: &Caller, request: NewShipment) -> Result<Shipment> {
        request.validate()?;

        let quote = self.config.rates.quote(
            request.package.weight,
            request.service,
            request.package.declared_value,
        )?;
        let pricing = quote.to_pricing();

        for attempt in 1..=self.config.max_tracking_number_attempts {
            let tracking_number = self.tracking_numbers.generate();
            let shipment = Shipment::create(
                tracking_number,
                caller.user_id,
                request.clone(),
                pricing.clone(),
                quote.estimated_days,
                Utc::now(),
            );

            match self.shipments.insert(shipment.clone()).await {
                Ok(()) => {
                    info!(
                        shipment_id = %shipment.id(),
                        tracking_number = %shipment.tracking_number(),
                        service = %shipment.service(),
                        total = %shipment.pricing().total,
                        "shipment created"
                    );
                    return Ok(shipment);
                }
                Err(ShipmentError::DuplicateTrackingNumber(taken)) => {
                    warn!(attempt, tracking_number = %taken, "tracking number collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ShipmentError::InternalError(
            format!(
                "could not mint a unique tracking number after {} attempts",
                self.config.max_tracking_number_attempts
            )
            .into(),
        ))
    }

    pub async fn get_shipment(&self, caller: &Caller, id: ShipmentId) -> Result<Shipment> {
        let shipment = self.load(id).await?;
        authorize(caller, Capability::ReadShipment, Some(shipment.owner()))?;
        Ok(shipment)
    }

    /// The caller's own shipments, newest first.
    pub async fn list_shipments(
        &self,
        caller: &Caller,
        status: Option<ShipmentStatus>,
        page: Option<PageRequest>,
    ) -> Result<Page<Shipment>> {
        let query = ShipmentQuery {
            owner: Some(caller.user_id),
            status,
            tracking_number_contains: None,
            page: page.unwrap_or_else(|| self.config.default_page()),
        };
        self.shipments.query(&query).await
    }

    pub async fn search_shipments(
        &self,
        caller: &Caller,
        search: ShipmentSearch,
    ) -> Result<Page<Shipment>> {
        authorize(caller, Capability::SearchShipments, None)?;
        let query = ShipmentQuery {
            owner: None,
            status: search.status,
            tracking_number_contains: search.tracking_number_contains,
            page: search.page.unwrap_or_else(|| self.config.default_page()),
        };
        self.shipments.query(&query).await
    }

    /// Public lookup. Malformed tracking numbers are reported as not found.
    pub async fn track(&self, tracking_number: &str) -> Result<TrackingSnapshot> {
        let not_found = || ShipmentError::not_found("Shipment", tracking_number);
        let tracking_number: TrackingNumber = tracking_number.parse().map_err(|_| not_found())?;
        self.shipments
            .find_by_tracking_number(&tracking_number)
            .await?
            .map(|shipment| shipment.snapshot())
            .ok_or_else(not_found)
    }

    /// Owner edit, allowed only while the shipment is pending.
    pub async fn update_shipment(
        &self,
        caller: &Caller,
        id: ShipmentId,
        edit: ShipmentEdit,
    ) -> Result<Shipment> {
        let caller = *caller;
        let updated = self
            .shipments
            .update(
                id,
                Box::new(move |shipment: &mut Shipment| {
                    authorize(&caller, Capability::EditShipment, Some(shipment.owner()))?;
                    shipment.apply_edit(edit, Utc::now())
                }),
            )
            .await?;
        info!(shipment_id = %id, "shipment updated");
        Ok(updated)
    }

    /// Owner cancellation from `pending` or `picked_up`.
    pub async fn cancel_shipment(&self, caller: &Caller, id: ShipmentId) -> Result<Shipment> {
        let caller = *caller;
        let cancelled = self
            .shipments
            .update(
                id,
                Box::new(move |shipment: &mut Shipment| {
                    authorize(&caller, Capability::CancelShipment, Some(shipment.owner()))?;
                    shipment.cancel(Utc::now())
                }),
            )
            .await?;
        info!(
            shipment_id = %id,
            tracking_number = %cancelled.tracking_number(),
            "shipment cancelled"
        );
        Ok(cancelled)
    }

    /// Staff status update. Appends one ledger event per call.
    pub async fn advance_status(
        &self,
        caller: &Caller,
        id: ShipmentId,
        update: StatusUpdate,
    ) -> Result<Shipment> {
        // role-only check, so it can run before the lookup
        authorize(caller, Capability::AdvanceStatus, None)?;
        update.validate()?;

        let policy = self.config.transition_policy;
        let status = update.status;
        let updated = self
            .shipments
            .update(
                id,
                Box::new(move |shipment: &mut Shipment| {
                    shipment.advance(update, policy, Utc::now())
                }),
            )
            .await?;
        info!(
            shipment_id = %id,
            tracking_number = %updated.tracking_number(),
            %status,
            events = updated.tracking().len(),
            "status advanced"
        );
        Ok(updated)
    }

    /// Same as [`advance_status`](Self::advance_status), addressed by
    /// tracking number.
    pub async fn advance_status_by_tracking_number(
        &self,
        caller: &Caller,
        tracking_number: &TrackingNumber,
        update: StatusUpdate,
    ) -> Result<Shipment> {
        authorize(caller, Capability::AdvanceStatus, None)?;
        let shipment = self
            .shipments
            .find_by_tracking_number(tracking_number)
            .await?
            .ok_or_else(|| ShipmentError::not_found("Shipment", tracking_number))?;
        self.advance_status(caller, shipment.id(), update).await
    }

    pub async fn assign_agent(
        &self,
        caller: &Caller,
        id: ShipmentId,
        agent: UserId,
    ) -> Result<Shipment> {
        authorize(caller, Capability::AssignAgent, None)?;
        let updated = self
            .shipments
            .update(
                id,
                Box::new(move |shipment: &mut Shipment| {
                    shipment.assign_agent(agent, Utc::now());
                    Ok(())
                }),
            )
            .await?;
        info!(shipment_id = %id, %agent, "agent assigned");
        Ok(updated)
    }

    /// Asks the gateway for a settlement intent covering the shipment total
    /// and records the pending payment.
    pub async fn request_payment(&self, caller: &Caller, id: ShipmentId) -> Result<PaymentIntent> {
        let shipment = self.load(id).await?;
        authorize(caller, Capability::RequestPayment, Some(shipment.owner()))?;

        if shipment.payment().status == PaymentStatus::Paid {
            return Err(ShipmentError::Precondition(format!(
                "Shipment {} is already paid",
                shipment.tracking_number()
            )));
        }
        if shipment.status() == ShipmentStatus::Cancelled {
            return Err(ShipmentError::Precondition(
                "Cannot pay for a cancelled shipment".to_string(),
            ));
        }

        let pricing = shipment.pricing();
        let request = SettlementIntentRequest {
            amount_minor: to_minor_units(pricing.total)?,
            currency: pricing.currency.clone(),
            metadata: SettlementMetadata {
                shipment_id: shipment.id(),
                user_id: caller.user_id,
            },
        };
        let intent = self.gateway.create_intent(request).await?;

        let payment = Payment::pending(
            caller.user_id,
            shipment.id(),
            pricing.total,
            &pricing.currency,
            &intent,
            self.gateway.method(),
            Utc::now(),
        );
        self.payments.insert(payment).await?;
        info!(shipment_id = %id, intent_id = %intent.id, "payment requested");
        Ok(intent)
    }

    /// Consumes a settlement confirmation from the gateway. Updates the
    /// payment record and the shipment's payment sub-record; the shipment
    /// status is left alone.
    ///
    /// The payment record is settled first, so a replayed confirmation is
    /// turned away before the shipment is touched. If the shipment cannot
    /// be written afterwards the payment is reopened and the confirmation
    /// can be delivered again.
    pub async fn confirm_payment(&self, confirmation: SettlementConfirmation) -> Result<Shipment> {
        let outcome = confirmation.outcome;
        let intent_id = confirmation.intent_id;
        let payment = self
            .payments
            .update(
                &intent_id,
                Box::new(move |payment: &mut Payment| payment.settle(outcome, Utc::now())),
            )
            .await?;

        let method = payment.method.clone();
        let transaction_id = confirmation.transaction_id;
        let recorded = self
            .shipments
            .update(
                payment.shipment_id,
                Box::new(move |shipment: &mut Shipment| {
                    shipment.record_settlement(outcome, &method, &transaction_id, Utc::now())
                }),
            )
            .await;

        let shipment = match recorded {
            Ok(shipment) => shipment,
            Err(e) => {
                warn!(%intent_id, error = %e, "shipment settlement failed, reopening payment");
                let reopened = self
                    .payments
                    .update(
                        &intent_id,
                        Box::new(|payment: &mut Payment| payment.reopen(Utc::now())),
                    )
                    .await;
                if let Err(reopen_error) = reopened {
                    error!(%intent_id, error = %reopen_error, "could not reopen payment");
                }
                return Err(e);
            }
        };

        info!(
            shipment_id = %shipment.id(),
            %intent_id,
            ?outcome,
            "settlement recorded"
        );
        Ok(shipment)
    }

    pub async fn payment_history(
        &self,
        caller: &Caller,
        page: Option<PageRequest>,
    ) -> Result<Page<Payment>> {
        self.payments
            .list_for_user(
                caller.user_id,
                page.unwrap_or_else(|| self.config.default_page()),
            )
            .await
    }

    async fn load(&self, id: ShipmentId) -> Result<Shipment> {
        self.shipments
            .get(id)
            .await?
            .ok_or_else(|| ShipmentError::not_found("Shipment", id))
    }
}
