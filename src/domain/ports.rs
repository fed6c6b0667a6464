use super::ids::{ShipmentId, UserId};
use super::payment::{Payment, PaymentIntent, SettlementIntentRequest};
use super::query::{Page, PageRequest, ShipmentQuery};
use super::shipment::Shipment;
use super::tracking_number::TrackingNumber;
use crate::error::Result;
use async_trait::async_trait;

/// Read-modify-write step applied by [`ShipmentStore::update`]. Returning
/// an error aborts the update and leaves the stored document unchanged.
pub type ShipmentMutation = Box<dyn FnOnce(&mut Shipment) -> Result<()> + Send>;

pub type PaymentMutation = Box<dyn FnOnce(&mut Payment) -> Result<()> + Send>;

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Inserts a new shipment. Fails with
    /// [`ShipmentError::DuplicateTrackingNumber`](crate::error::ShipmentError::DuplicateTrackingNumber)
    /// when the tracking number is already taken.
    async fn insert(&self, shipment: Shipment) -> Result<()>;
    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>>;
    async fn find_by_tracking_number(&self, tracking_number: &TrackingNumber) -> Result<Option<Shipment>>;
    /// Atomically applies `mutation` to the stored shipment and returns the
    /// new version. Concurrent updates of the same shipment are serialized.
    async fn update(&self, id: ShipmentId, mutation: ShipmentMutation) -> Result<Shipment>;
    async fn query(&self, query: &ShipmentQuery) -> Result<Page<Shipment>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Payment>>;
    async fn update(&self, intent_id: &str, mutation: PaymentMutation) -> Result<Payment>;
    /// Payments of one user, newest first.
    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Payment>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: SettlementIntentRequest) -> Result<PaymentIntent>;
    /// Method name recorded on payments settled through this gateway.
    fn method(&self) -> &str;
}

pub type ShipmentStoreBox = Box<dyn ShipmentStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
