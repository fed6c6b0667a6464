#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use haulage::application::service::ShipmentService;
use haulage::config::ServiceConfig;
use haulage::domain::ids::{ShipmentId, UserId};
use haulage::domain::payment::Payment;
use haulage::domain::ports::{PaymentMutation, PaymentStore, ShipmentMutation, ShipmentStore};
use haulage::domain::query::{Page, PageRequest, ShipmentQuery};
use haulage::domain::rate::ServiceClass;
use haulage::domain::shipment::{Address, Contact, NewShipment, Package, Shipment};
use haulage::domain::tracking_number::{TrackingNumber, TrackingNumberGenerator};
use haulage::error::{Result, ShipmentError};
use haulage::infrastructure::gateway::SimulatedGateway;
use haulage::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryShipmentStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub fn contact(name: &str, city: &str) -> Contact {
    Contact {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "+1 (555) 123-4567".to_string(),
        address: Address {
            street: "123 Main St".to_string(),
            city: city.to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
            country: "United States".to_string(),
        },
    }
}

pub fn package(weight: Decimal, declared_value: Decimal) -> Package {
    Package {
        weight,
        length: dec!(30),
        width: dec!(20),
        height: dec!(15),
        description: "Electronics".to_string(),
        declared_value,
    }
}

pub fn new_shipment(service: ServiceClass, weight: Decimal, declared_value: Decimal) -> NewShipment {
    NewShipment {
        sender: contact("John Doe", "New York"),
        recipient: contact("Alice Johnson", "Los Angeles"),
        package: package(weight, declared_value),
        service,
        notes: None,
    }
}

pub fn standard_shipment() -> NewShipment {
    new_shipment(ServiceClass::Standard, dec!(1.2), dec!(150))
}

pub fn service_with(config: ServiceConfig, gateway: SimulatedGateway) -> ShipmentService {
    ShipmentService::new(
        Box::new(InMemoryShipmentStore::new()),
        Box::new(InMemoryPaymentStore::new()),
        Box::new(gateway),
        config,
    )
    .unwrap()
}

pub fn service() -> ShipmentService {
    service_with(ServiceConfig::default(), SimulatedGateway::new())
}

pub fn service_with_stores(
    shipments: impl ShipmentStore + 'static,
    payments: impl PaymentStore + 'static,
) -> ShipmentService {
    ShipmentService::new(
        Box::new(shipments),
        Box::new(payments),
        Box::new(SimulatedGateway::new()),
        ServiceConfig::default(),
    )
    .unwrap()
}

fn write_failure() -> ShipmentError {
    ShipmentError::IoError(std::io::Error::other("disk unavailable"))
}

/// In-memory shipment store whose updates fail while switched off. Clones
/// share the data and the switch.
#[derive(Default, Clone)]
pub struct FailingShipmentStore {
    inner: InMemoryShipmentStore,
    fail_updates: Arc<AtomicBool>,
}

impl FailingShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShipmentStore for FailingShipmentStore {
    async fn insert(&self, shipment: Shipment) -> Result<()> {
        self.inner.insert(shipment).await
    }

    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        self.inner.get(id).await
    }

    async fn find_by_tracking_number(&self, tracking_number: &TrackingNumber) -> Result<Option<Shipment>> {
        self.inner.find_by_tracking_number(tracking_number).await
    }

    async fn update(&self, id: ShipmentId, mutation: ShipmentMutation) -> Result<Shipment> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(write_failure());
        }
        self.inner.update(id, mutation).await
    }

    async fn query(&self, query: &ShipmentQuery) -> Result<Page<Shipment>> {
        self.inner.query(query).await
    }
}

/// Payment counterpart of [`FailingShipmentStore`].
#[derive(Default, Clone)]
pub struct FailingPaymentStore {
    inner: InMemoryPaymentStore,
    fail_updates: Arc<AtomicBool>,
}

impl FailingPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentStore for FailingPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        self.inner.insert(payment).await
    }

    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Payment>> {
        self.inner.find_by_intent(intent_id).await
    }

    async fn update(&self, intent_id: &str, mutation: PaymentMutation) -> Result<Payment> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(write_failure());
        }
        self.inner.update(intent_id, mutation).await
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Payment>> {
        self.inner.list_for_user(user_id, page).await
    }
}

pub fn tracking_number(suffix: u32) -> TrackingNumber {
    let date = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
    TrackingNumber::compose("EHE", date, suffix).unwrap()
}

/// Hands out a fixed sequence of tracking numbers and then repeats the last
/// one forever.
pub struct ScriptedTrackingNumbers {
    queue: Mutex<VecDeque<TrackingNumber>>,
}

impl ScriptedTrackingNumbers {
    pub fn new(numbers: impl IntoIterator<Item = TrackingNumber>) -> Self {
        Self {
            queue: Mutex::new(numbers.into_iter().collect()),
        }
    }
}

impl TrackingNumberGenerator for ScriptedTrackingNumbers {
    fn generate(&self) -> TrackingNumber {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}
