use crate::domain::ids::{ShipmentId, UserId};
use crate::domain::payment::Payment;
use crate::domain::ports::{PaymentMutation, PaymentStore, ShipmentMutation, ShipmentStore};
use crate::domain::query::{Page, PageRequest, ShipmentQuery};
use crate::domain::shipment::Shipment;
use crate::domain::tracking_number::TrackingNumber;
use crate::error::{Result, ShipmentError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ShipmentTable {
    by_id: HashMap<ShipmentId, Shipment>,
    by_tracking_number: HashMap<TrackingNumber, ShipmentId>,
}

/// A thread-safe in-memory store for shipments.
///
/// Keeps a unique index on the tracking number next to the documents. All
/// writes take the table's write lock, which serializes updates and makes
/// each read-modify-write atomic.
#[derive(Default, Clone)]
pub struct InMemoryShipmentStore {
    table: Arc<RwLock<ShipmentTable>>,
}

impl InMemoryShipmentStore {
    /// Creates a new, empty in-memory shipment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn insert(&self, shipment: Shipment) -> Result<()> {
        let mut table = self.table.write().await;
        if table.by_tracking_number.contains_key(shipment.tracking_number()) {
            return Err(ShipmentError::DuplicateTrackingNumber(
                shipment.tracking_number().to_string(),
            ));
        }
        if table.by_id.contains_key(&shipment.id()) {
            return Err(ShipmentError::InternalError(
                format!("shipment id {} already stored", shipment.id()).into(),
            ));
        }
        table
            .by_tracking_number
            .insert(shipment.tracking_number().clone(), shipment.id());
        table.by_id.insert(shipment.id(), shipment);
        Ok(())
    }

    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        let table = self.table.read().await;
        Ok(table.by_id.get(&id).cloned())
    }

    async fn find_by_tracking_number(&self, tracking_number: &TrackingNumber) -> Result<Option<Shipment>> {
        let table = self.table.read().await;
        Ok(table
            .by_tracking_number
            .get(tracking_number)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn update(&self, id: ShipmentId, mutation: ShipmentMutation) -> Result<Shipment> {
        let mut table = self.table.write().await;
        let current = table
            .by_id
            .get_mut(&id)
            .ok_or_else(|| ShipmentError::not_found("Shipment", id))?;

        // mutate a copy so a failed mutation leaves the stored version intact
        let mut next = current.clone();
        mutation(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn query(&self, query: &ShipmentQuery) -> Result<Page<Shipment>> {
        let table = self.table.read().await;
        Ok(query.apply(table.by_id.values().cloned()))
    }
}

/// A thread-safe in-memory store for payments, keyed by gateway intent id.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.intent_id) {
            return Err(ShipmentError::InternalError(
                format!("payment intent {} already recorded", payment.intent_id).into(),
            ));
        }
        payments.insert(payment.intent_id.clone(), payment);
        Ok(())
    }

    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(intent_id).cloned())
    }

    async fn update(&self, intent_id: &str, mutation: PaymentMutation) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        let current = payments
            .get_mut(intent_id)
            .ok_or_else(|| ShipmentError::not_found("Payment", intent_id))?;
        let mut next = current.clone();
        mutation(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Payment>> {
        let payments = self.payments.read().await;
        let mut owned: Vec<Payment> = payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::paginate(owned, page))
    }
}
