//! Store double that wraps [`LocalStore`] and fails selected writes on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lubetrack_api::errors::ServiceError;
use lubetrack_api::models::{
    Equipment, InventoryItem, ItemUpdate, Quantity, Record, ServiceRecord, SopCategory,
    SopDocument, StockTransaction,
};
use lubetrack_api::store::{
    Backend, Collection, InventoryCollection, LocalStore, OrderBy, SettingsStore, Store,
    StoreHandle,
};
use sea_orm::DbErr;

/// Switches shared between a test and its [`FaultyStore`].
#[derive(Debug)]
pub struct Faults {
    fail_transaction_writes: AtomicBool,
    fail_equipment_writes: AtomicBool,
    /// Stock adjustments still allowed to succeed; `usize::MAX` means no limit.
    adjustments_left: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            fail_transaction_writes: AtomicBool::new(false),
            fail_equipment_writes: AtomicBool::new(false),
            adjustments_left: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Faults {
    pub fn fail_transaction_writes(&self, on: bool) {
        self.fail_transaction_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_equipment_writes(&self, on: bool) {
        self.fail_equipment_writes.store(on, Ordering::SeqCst);
    }

    /// Lets `count` more stock adjustments through, then fails the rest.
    pub fn allow_adjustments(&self, count: usize) {
        self.adjustments_left.store(count, Ordering::SeqCst);
    }

    fn take_adjustment(&self) -> bool {
        self.adjustments_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                usize::MAX => Some(left),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok()
    }
}

fn injected(what: &str) -> ServiceError {
    ServiceError::DatabaseError(DbErr::Custom(format!("injected {} failure", what)))
}

fn equipment_of(store: &LocalStore) -> &dyn Collection<Equipment> {
    store.equipment()
}

fn transactions_of(store: &LocalStore) -> &dyn Collection<StockTransaction> {
    store.transactions()
}

fn equipment_fault(faults: &Faults) -> bool {
    faults.fail_equipment_writes.load(Ordering::SeqCst)
}

fn transaction_fault(faults: &Faults) -> bool {
    faults.fail_transaction_writes.load(Ordering::SeqCst)
}

pub struct FaultyCollection<T: Record> {
    inner: Arc<LocalStore>,
    faults: Arc<Faults>,
    select: fn(&LocalStore) -> &dyn Collection<T>,
    failing: fn(&Faults) -> bool,
}

#[async_trait]
impl<T: Record> Collection<T> for FaultyCollection<T> {
    async fn list(&self, order_by: Option<&OrderBy>) -> Result<Vec<T>, ServiceError> {
        (self.select)(&self.inner).list(order_by).await
    }

    async fn get(&self, id: &str) -> Result<Option<T>, ServiceError> {
        (self.select)(&self.inner).get(id).await
    }

    async fn upsert(&self, items: Vec<T>) -> Result<(), ServiceError> {
        if (self.failing)(&self.faults) {
            return Err(injected(T::COLLECTION));
        }
        (self.select)(&self.inner).upsert(items).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if (self.failing)(&self.faults) {
            return Err(injected(T::COLLECTION));
        }
        (self.select)(&self.inner).delete(id).await
    }
}

pub struct FaultyInventory {
    inner: Arc<LocalStore>,
    faults: Arc<Faults>,
}

#[async_trait]
impl Collection<InventoryItem> for FaultyInventory {
    async fn list(&self, order_by: Option<&OrderBy>) -> Result<Vec<InventoryItem>, ServiceError> {
        self.inner.inventory().list(order_by).await
    }

    async fn get(&self, id: &str) -> Result<Option<InventoryItem>, ServiceError> {
        self.inner.inventory().get(id).await
    }

    async fn upsert(&self, items: Vec<InventoryItem>) -> Result<(), ServiceError> {
        self.inner.inventory().upsert(items).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.inner.inventory().delete(id).await
    }
}

#[async_trait]
impl InventoryCollection for FaultyInventory {
    async fn adjust_stock(&self, id: &str, delta: Quantity) -> Result<InventoryItem, ServiceError> {
        if !self.faults.take_adjustment() {
            return Err(injected("stock adjustment"));
        }
        self.inner.inventory().adjust_stock(id, delta).await
    }

    async fn update_details(
        &self,
        id: &str,
        details: &ItemUpdate,
    ) -> Result<InventoryItem, ServiceError> {
        self.inner.inventory().update_details(id, details).await
    }
}

/// [`LocalStore`] whose transaction, equipment and stock writes can be made to fail.
pub struct FaultyStore {
    inner: Arc<LocalStore>,
    equipment: FaultyCollection<Equipment>,
    transactions: FaultyCollection<StockTransaction>,
    inventory: FaultyInventory,
}

impl FaultyStore {
    pub fn new(faults: Arc<Faults>) -> Self {
        let inner = Arc::new(LocalStore::in_memory());
        Self {
            equipment: FaultyCollection {
                inner: inner.clone(),
                faults: faults.clone(),
                select: equipment_of,
                failing: equipment_fault,
            },
            transactions: FaultyCollection {
                inner: inner.clone(),
                faults: faults.clone(),
                select: transactions_of,
                failing: transaction_fault,
            },
            inventory: FaultyInventory {
                inner: inner.clone(),
                faults,
            },
            inner,
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn equipment(&self) -> &dyn Collection<Equipment> {
        &self.equipment
    }

    fn records(&self) -> &dyn Collection<ServiceRecord> {
        self.inner.records()
    }

    fn inventory(&self) -> &dyn InventoryCollection {
        &self.inventory
    }

    fn transactions(&self) -> &dyn Collection<StockTransaction> {
        &self.transactions
    }

    fn sop_categories(&self) -> &dyn Collection<SopCategory> {
        self.inner.sop_categories()
    }

    fn sop_documents(&self) -> &dyn Collection<SopDocument> {
        self.inner.sop_documents()
    }

    fn settings(&self) -> &dyn SettingsStore {
        self.inner.settings()
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.inner.ping().await
    }
}

/// A connected handle over a fresh [`FaultyStore`] plus its switches.
pub fn faulty_handle() -> (StoreHandle, Arc<Faults>) {
    let faults = Arc::new(Faults::default());
    let handle = StoreHandle::connected(FaultyStore::new(faults.clone()));
    (handle, faults)
}
