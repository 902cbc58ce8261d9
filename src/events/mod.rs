//! Change notifications.
//!
//! Services publish a [`Change`] after every successful mutation. Consumers
//! treat a change as a signal to refetch, never as a patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::models::{
    AppSettings, Equipment, InventoryItem, ServiceRecord, SopCategory, SopDocument,
    StockTransaction,
};
use crate::store::StoreHandle;

/// Collection that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Equipment,
    Records,
    Inventory,
    Transactions,
    SopCategories,
    SopDocuments,
    Settings,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `change`; having no subscribers is not an error.
    pub fn publish(&self, change: Change) {
        match self.sender.send(change) {
            Ok(receivers) => debug!(?change, receivers, "change published"),
            Err(_) => debug!(?change, "change published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Every collection as of one reload.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub equipment: Vec<Equipment>,
    pub records: Vec<ServiceRecord>,
    pub inventory: Vec<InventoryItem>,
    pub transactions: Vec<StockTransaction>,
    pub sop_categories: Vec<SopCategory>,
    pub sop_documents: Vec<SopDocument>,
    pub settings: AppSettings,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    async fn load(store: &StoreHandle) -> Result<Self, ServiceError> {
        let store = store.require()?;
        Ok(Snapshot {
            equipment: store.equipment().list(None).await?,
            records: store.records().list(None).await?,
            inventory: store.inventory().list(None).await?,
            transactions: store.transactions().list(None).await?,
            sop_categories: store.sop_categories().list(None).await?,
            sop_documents: store.sop_documents().list(None).await?,
            settings: store.settings().load().await?,
            loaded_at: Some(Utc::now()),
        })
    }
}

/// Whole-set cache that reloads everything on any change.
pub struct WorkingSet {
    store: StoreHandle,
    current: RwLock<Snapshot>,
    reloads: watch::Sender<u64>,
}

impl WorkingSet {
    pub fn new(store: StoreHandle) -> Arc<Self> {
        let (reloads, _) = watch::channel(0);
        Arc::new(Self {
            store,
            current: RwLock::new(Snapshot::default()),
            reloads,
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.current.read().await.clone()
    }

    /// Number of completed reloads, observable for waiting on a refresh.
    pub fn reloads(&self) -> watch::Receiver<u64> {
        self.reloads.subscribe()
    }

    /// Refetches every collection; on failure the previous snapshot is kept.
    pub async fn reload(&self) -> Result<(), ServiceError> {
        match Snapshot::load(&self.store).await {
            Ok(snapshot) => {
                *self.current.write().await = snapshot;
                self.reloads.send_modify(|n| *n += 1);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "working set reload failed; keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Reloads on every change until the feed closes.
    pub fn spawn(self: &Arc<Self>, feed: &ChangeFeed) -> JoinHandle<()> {
        let mut rx = feed.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            info!("working set refresh loop started");
            let _ = this.reload().await;
            loop {
                match rx.recv().await {
                    Ok(change) => debug!(?change, "refetching working set"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "change feed lagged; refetching working set")
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let _ = this.reload().await;
            }
            info!("working set refresh loop stopped");
        })
    }
}
