use crate::domain::ids::{ShipmentId, UserId};
use crate::domain::payment::Payment;
use crate::domain::ports::{PaymentMutation, PaymentStore, ShipmentMutation, ShipmentStore};
use crate::domain::query::{Page, PageRequest, ShipmentQuery};
use crate::domain::shipment::Shipment;
use crate::domain::tracking_number::TrackingNumber;
use crate::error::{Result, ShipmentError};
use ::rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for shipment documents, keyed by shipment id.
pub const CF_SHIPMENTS: &str = "shipments";
/// Column Family for the unique tracking-number index.
pub const CF_TRACKING_NUMBERS: &str = "tracking_numbers";
/// Column Family for payments, keyed by gateway intent id.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent store implementation using RocksDB.
///
/// Stores shipments, the tracking-number index and payments in separate
/// Column Families. Writes go through a single async mutex so that the
/// uniqueness check on insert and every read-modify-write are atomic with
/// respect to each other; reads do not take the lock.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_SHIPMENTS, CF_TRACKING_NUMBERS, CF_PAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ShipmentError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }
}

#[async_trait]
impl ShipmentStore for RocksDBStore {
    async fn insert(&self, shipment: Shipment) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let index = self.cf(CF_TRACKING_NUMBERS)?;
        let number_key = shipment.tracking_number().as_str().as_bytes();
        if self.db.get_pinned_cf(index, number_key)?.is_some() {
            return Err(ShipmentError::DuplicateTrackingNumber(
                shipment.tracking_number().to_string(),
            ));
        }

        let shipments = self.cf(CF_SHIPMENTS)?;
        let id_key = shipment.id().as_uuid().as_bytes().to_vec();
        let mut batch = WriteBatch::default();
        batch.put_cf(shipments, &id_key, serde_json::to_vec(&shipment)?);
        batch.put_cf(index, number_key, &id_key);
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: ShipmentId) -> Result<Option<Shipment>> {
        self.read(CF_SHIPMENTS, id.as_uuid().as_bytes())
    }

    async fn find_by_tracking_number(&self, tracking_number: &TrackingNumber) -> Result<Option<Shipment>> {
        let index = self.cf(CF_TRACKING_NUMBERS)?;
        match self.db.get_cf(index, tracking_number.as_str().as_bytes())? {
            Some(id_key) => self.read(CF_SHIPMENTS, &id_key),
            None => Ok(None),
        }
    }

    async fn update(&self, id: ShipmentId, mutation: ShipmentMutation) -> Result<Shipment> {
        let _guard = self.write_lock.lock().await;

        let key = id.as_uuid().as_bytes();
        let mut shipment: Shipment = self
            .read(CF_SHIPMENTS, key)?
            .ok_or_else(|| ShipmentError::not_found("Shipment", id))?;
        mutation(&mut shipment)?;
        self.write(CF_SHIPMENTS, key, &shipment)?;
        Ok(shipment)
    }

    async fn query(&self, query: &ShipmentQuery) -> Result<Page<Shipment>> {
        let shipments: Vec<Shipment> = self.scan(CF_SHIPMENTS)?;
        Ok(query.apply(shipments))
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = payment.intent_id.as_bytes();
        if self.read::<Payment>(CF_PAYMENTS, key)?.is_some() {
            return Err(ShipmentError::InternalError(
                format!("payment intent {} already recorded", payment.intent_id).into(),
            ));
        }
        self.write(CF_PAYMENTS, key, &payment)
    }

    async fn find_by_intent(&self, intent_id: &str) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, intent_id.as_bytes())
    }

    async fn update(&self, intent_id: &str, mutation: PaymentMutation) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .read(CF_PAYMENTS, intent_id.as_bytes())?
            .ok_or_else(|| ShipmentError::not_found("Payment", intent_id))?;
        mutation(&mut payment)?;
        self.write(CF_PAYMENTS, intent_id.as_bytes(), &payment)?;
        Ok(payment)
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Payment>> {
        let mut payments: Vec<Payment> = self
            .scan::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::paginate(payments, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shipment::{StatusUpdate, fixtures};
    use crate::domain::status::{ShipmentStatus, TransitionPolicy};
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_SHIPMENTS).is_some());
        assert!(store.db.cf_handle(CF_TRACKING_NUMBERS).is_some());
        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_shipment_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let shipment = fixtures::shipment(UserId::new());

        ShipmentStore::insert(&store, shipment.clone()).await.unwrap();
        let retrieved = ShipmentStore::get(&store, shipment.id()).await.unwrap().unwrap();
        assert_eq!(retrieved, shipment);

        let by_number = store
            .find_by_tracking_number(shipment.tracking_number())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_number.id(), shipment.id());

        let duplicate = ShipmentStore::insert(&store, fixtures::shipment(UserId::new())).await;
        assert!(matches!(
            duplicate,
            Err(ShipmentError::DuplicateTrackingNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_update_survives_reopen() {
        let dir = tempdir().unwrap();
        let shipment = fixtures::shipment(UserId::new());
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            ShipmentStore::insert(&store, shipment.clone()).await.unwrap();
            ShipmentStore::update(
                &store,
                shipment.id(),
                Box::new(|s: &mut Shipment| {
                    s.advance(
                        StatusUpdate::new(ShipmentStatus::PickedUp, "New York", "Picked up"),
                        TransitionPolicy::Permissive,
                        Utc::now(),
                    )
                }),
            )
            .await
            .unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        let reopened = ShipmentStore::get(&store, shipment.id()).await.unwrap().unwrap();
        assert_eq!(reopened.status(), ShipmentStatus::PickedUp);
        assert_eq!(reopened.tracking().len(), 2);

        let page = store.query(&ShipmentQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }
}
