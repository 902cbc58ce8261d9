use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::degrade;
use crate::errors::ServiceError;
use crate::events::{Change, ChangeFeed};
use crate::models::{
    InventoryItem, ItemUpdate, LedgerReport, NewItem, NewTransaction, Quantity, StockTransaction,
    TransactionFilter,
};
use crate::schedule::SharedClock;
use crate::store::{OrderBy, Store, StoreHandle};

/// In-process critical sections keyed by inventory item id.
#[derive(Default)]
struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let handle = self.locks.entry(key.to_string()).or_default().clone();
        handle.lock_owned().await
    }

    /// Locks both keys in a fixed order so two editors cannot deadlock.
    async fn lock_pair(&self, a: &str, b: &str) -> Vec<OwnedMutexGuard<()>> {
        if a == b {
            return vec![self.lock(a).await];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        vec![first, second]
    }
}

/// Keeps every item's stock equal to its opening stock plus the signed
/// amounts of the transactions that reference it.
#[derive(Clone)]
pub struct StockLedger {
    store: StoreHandle,
    feed: ChangeFeed,
    clock: SharedClock,
    locks: Arc<KeyedLocks>,
}

impl StockLedger {
    pub fn new(store: StoreHandle, feed: ChangeFeed, clock: SharedClock) -> Self {
        Self {
            store,
            feed,
            clock,
            locks: Arc::new(KeyedLocks::default()),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let items = match self.store.require() {
            Ok(store) => store.inventory().list(Some(&OrderBy::asc("name"))).await,
            Err(e) => Err(e),
        };
        degrade(items, "inventory items")
    }

    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let items = self.list_items().await?;
        Ok(items.into_iter().filter(InventoryItem::is_low_stock).collect())
    }

    #[instrument(skip(self))]
    pub async fn create_item(&self, input: NewItem) -> Result<InventoryItem, ServiceError> {
        input.validate()?;
        if input.opening_stock < Quantity::ZERO {
            return Err(ServiceError::ValidationError(
                "opening stock cannot be negative".into(),
            ));
        }
        if input.min_threshold < Quantity::ZERO {
            return Err(ServiceError::ValidationError(
                "minimum threshold cannot be negative".into(),
            ));
        }
        let store = self.store.require()?;
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            item_type: input.item_type,
            stock: input.opening_stock,
            opening_stock: input.opening_stock,
            unit: input.unit,
            min_threshold: input.min_threshold,
        };
        store.inventory().upsert(vec![item.clone()]).await?;
        info!(item_id = %item.id, stock = %item.stock, "inventory item created");
        self.feed.publish(Change::Inventory);
        Ok(item)
    }

    /// Edits name, type, unit and threshold. Stock is untouched.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        id: &str,
        input: ItemUpdate,
    ) -> Result<InventoryItem, ServiceError> {
        input.validate()?;
        if input.min_threshold < Quantity::ZERO {
            return Err(ServiceError::ValidationError(
                "minimum threshold cannot be negative".into(),
            ));
        }
        let store = self.store.require()?;
        let details = ItemUpdate {
            name: input.name.trim().to_string(),
            ..input
        };
        let item = store.inventory().update_details(id, &details).await?;
        info!(item_id = %id, "inventory item details updated");
        self.feed.publish(Change::Inventory);
        Ok(item)
    }

    /// Deletes an item that no transaction references any more.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: &str) -> Result<(), ServiceError> {
        let store = self.store.require()?;
        let _guard = self.locks.lock(id).await;
        if store.inventory().get(id).await?.is_none() {
            return Err(ServiceError::item_not_found(id));
        }
        let referencing = store
            .transactions()
            .list(None)
            .await?
            .into_iter()
            .filter(|tx| tx.inventory_id == id)
            .count();
        if referencing > 0 {
            return Err(ServiceError::Conflict(format!(
                "inventory item {} still has {} transactions",
                id, referencing
            )));
        }
        store.inventory().delete(id).await?;
        info!(item_id = %id, "inventory item deleted");
        self.feed.publish(Change::Inventory);
        Ok(())
    }

    /// Transactions newest first, optionally for one item.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<StockTransaction>, ServiceError> {
        let txs = match self.store.require() {
            Ok(store) => {
                store
                    .transactions()
                    .list(Some(&OrderBy::desc("timestamp")))
                    .await
            }
            Err(e) => Err(e),
        };
        let txs = degrade(txs, "stock transactions")?;
        Ok(match filter.inventory_id {
            Some(item_id) => txs
                .into_iter()
                .filter(|tx| tx.inventory_id == item_id)
                .collect(),
            None => txs,
        })
    }

    #[instrument(skip(self))]
    pub async fn record_transaction(
        &self,
        input: NewTransaction,
    ) -> Result<StockTransaction, ServiceError> {
        validate_movement(&input)?;
        let store = self.store.require()?;
        let _guard = self.locks.lock(&input.inventory_id).await;

        let item = store
            .inventory()
            .get(&input.inventory_id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(&input.inventory_id))?;

        let tx = StockTransaction {
            id: Uuid::new_v4().to_string(),
            inventory_id: item.id.clone(),
            inventory_name: item.name.clone(),
            direction: input.direction,
            amount: input.amount,
            timestamp: self.clock.now(),
            user: input.user.trim().to_string(),
        };
        let delta = tx.signed_amount();
        let updated = store.inventory().adjust_stock(&item.id, delta).await?;

        if let Err(e) = store.transactions().upsert(vec![tx.clone()]).await {
            return Err(self.roll_back(store, &[(item.id.clone(), delta)], e).await);
        }

        info!(
            item_id = %item.id,
            direction = tx.direction.as_str(),
            delta = %delta,
            stock = %updated.stock,
            "stock transaction recorded"
        );
        self.publish_ledger_change();
        Ok(tx)
    }

    /// Replaces a transaction's movement, applying only the net difference.
    ///
    /// Moving a transaction to another item reverses it on the old item and
    /// applies it to the new one; the name snapshot follows the new item.
    #[instrument(skip(self))]
    pub async fn edit_transaction(
        &self,
        id: &str,
        input: NewTransaction,
    ) -> Result<StockTransaction, ServiceError> {
        validate_movement(&input)?;
        let store = self.store.require()?;

        let seen = store
            .transactions()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::transaction_not_found(id))?;
        let _guards = self
            .locks
            .lock_pair(&seen.inventory_id, &input.inventory_id)
            .await;

        let existing = store
            .transactions()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::transaction_not_found(id))?;
        if existing.inventory_id != seen.inventory_id {
            return Err(ServiceError::Conflict(format!(
                "transaction {} was moved to another item while being edited",
                id
            )));
        }

        let mut updated = StockTransaction {
            id: existing.id.clone(),
            inventory_id: input.inventory_id.clone(),
            inventory_name: existing.inventory_name.clone(),
            direction: input.direction,
            amount: input.amount,
            timestamp: existing.timestamp,
            user: input.user.trim().to_string(),
        };
        let old_signed = existing.signed_amount();
        let new_signed = updated.signed_amount();
        let mut applied: Vec<(String, Quantity)> = Vec::new();

        if existing.inventory_id == updated.inventory_id {
            let delta = new_signed - old_signed;
            if !delta.is_zero() {
                store.inventory().adjust_stock(&existing.inventory_id, delta).await?;
                applied.push((existing.inventory_id.clone(), delta));
            }
        } else {
            let target = store
                .inventory()
                .get(&updated.inventory_id)
                .await?
                .ok_or_else(|| ServiceError::item_not_found(&updated.inventory_id))?;
            updated.inventory_name = target.name;

            store
                .inventory()
                .adjust_stock(&existing.inventory_id, -old_signed)
                .await?;
            applied.push((existing.inventory_id.clone(), -old_signed));

            if let Err(e) = store
                .inventory()
                .adjust_stock(&updated.inventory_id, new_signed)
                .await
            {
                return Err(self.roll_back(store, &applied, e).await);
            }
            applied.push((updated.inventory_id.clone(), new_signed));
        }

        if let Err(e) = store.transactions().upsert(vec![updated.clone()]).await {
            return Err(self.roll_back(store, &applied, e).await);
        }

        info!(
            transaction_id = %id,
            from_item = %existing.inventory_id,
            to_item = %updated.inventory_id,
            adjustments = applied.len(),
            "stock transaction edited"
        );
        self.publish_ledger_change();
        Ok(updated)
    }

    /// Reverses the transaction's effect on stock, then removes it.
    #[instrument(skip(self))]
    pub async fn delete_transaction(&self, id: &str) -> Result<(), ServiceError> {
        let store = self.store.require()?;
        let seen = store
            .transactions()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::transaction_not_found(id))?;
        let _guard = self.locks.lock(&seen.inventory_id).await;

        let existing = store
            .transactions()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::transaction_not_found(id))?;
        if existing.inventory_id != seen.inventory_id {
            return Err(ServiceError::Conflict(format!(
                "transaction {} was moved to another item while being deleted",
                id
            )));
        }

        let reverse = -existing.signed_amount();
        let updated = store
            .inventory()
            .adjust_stock(&existing.inventory_id, reverse)
            .await?;

        if let Err(e) = store.transactions().delete(id).await {
            return Err(self
                .roll_back(store, &[(existing.inventory_id.clone(), reverse)], e)
                .await);
        }

        info!(
            transaction_id = %id,
            item_id = %existing.inventory_id,
            delta = %reverse,
            stock = %updated.stock,
            "stock transaction deleted"
        );
        self.publish_ledger_change();
        Ok(())
    }

    /// Compares stored stock with opening stock plus the transaction history.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, id: &str) -> Result<LedgerReport, ServiceError> {
        let store = self.store.require()?;
        let item = store
            .inventory()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(id))?;
        let history: Vec<StockTransaction> = store
            .transactions()
            .list(None)
            .await?
            .into_iter()
            .filter(|tx| tx.inventory_id == id)
            .collect();
        let expected = item.opening_stock
            + history
                .iter()
                .map(StockTransaction::signed_amount)
                .sum::<Quantity>();
        let consistent = expected == item.stock;
        if !consistent {
            warn!(item_id = %id, expected = %expected, actual = %item.stock, "ledger drift detected");
        }
        Ok(LedgerReport {
            inventory_id: item.id,
            expected,
            actual: item.stock,
            transaction_count: history.len(),
            consistent,
        })
    }

    /// Undoes `applied` adjustments, newest first.
    ///
    /// Returns `cause` when every reversal succeeds, `LedgerInconsistent` otherwise.
    async fn roll_back(
        &self,
        store: &dyn Store,
        applied: &[(String, Quantity)],
        cause: ServiceError,
    ) -> ServiceError {
        warn!(error = %cause, adjustments = applied.len(), "ledger write failed; reversing stock adjustments");
        for (item_id, delta) in applied.iter().rev() {
            if let Err(e) = store.inventory().adjust_stock(item_id, -*delta).await {
                error!(item_id = %item_id, delta = %delta, error = %e, "stock reversal failed");
                return ServiceError::LedgerInconsistent(format!(
                    "item {} kept an adjustment of {} after: {}; reversal failed: {}",
                    item_id, delta, cause, e
                ));
            }
        }
        cause
    }

    fn publish_ledger_change(&self) {
        self.feed.publish(Change::Inventory);
        self.feed.publish(Change::Transactions);
    }
}

fn validate_movement(input: &NewTransaction) -> Result<(), ServiceError> {
    input.validate()?;
    if !input.amount.is_positive() {
        return Err(ServiceError::ValidationError(
            "amount must be greater than zero".into(),
        ));
    }
    if input.user.trim().is_empty() {
        return Err(ServiceError::ValidationError("user is required".into()));
    }
    if input.inventory_id.trim().is_empty() {
        return Err(ServiceError::ValidationError("inventory id is required".into()));
    }
    Ok(())
}
