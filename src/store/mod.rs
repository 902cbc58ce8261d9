//! Persistence adapter.
//!
//! Services talk to storage only through the traits here. Two backings
//! implement them: [`LocalStore`] (in-process documents, optionally snapshotted
//! to a JSON file) and [`SqlStore`] (sea-orm over SQLite or Postgres).

mod local;
mod sql;

pub use local::LocalStore;
pub use sql::SqlStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::models::{
    AppSettings, Equipment, InventoryItem, ItemUpdate, Quantity, Record, ServiceRecord,
    SopCategory, SopDocument, StockTransaction,
};

/// Sort request for [`Collection::list`]; `field` is the snake_case field name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Uniform access to one entity collection.
#[async_trait]
pub trait Collection<T: Record>: Send + Sync {
    async fn list(&self, order_by: Option<&OrderBy>) -> Result<Vec<T>, ServiceError>;

    async fn get(&self, id: &str) -> Result<Option<T>, ServiceError>;

    /// Inserts or replaces every item by id.
    async fn upsert(&self, items: Vec<T>) -> Result<(), ServiceError>;

    /// Removes the item; deleting an absent id succeeds.
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait InventoryCollection: Collection<InventoryItem> {
    /// Atomically applies `stock = stock + delta` and returns the updated item.
    /// Fails with `ValidationError` when the result would exceed `Quantity::MAX`.
    async fn adjust_stock(&self, id: &str, delta: Quantity) -> Result<InventoryItem, ServiceError>;

    /// Rewrites name, type, unit and threshold only; stock columns are left
    /// to whatever `adjust_stock` last wrote.
    async fn update_details(
        &self,
        id: &str,
        details: &ItemUpdate,
    ) -> Result<InventoryItem, ServiceError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or the defaults when none were saved yet.
    async fn load(&self) -> Result<AppSettings, ServiceError>;

    async fn save(&self, settings: AppSettings) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Sql,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Sql => f.write_str("sql"),
        }
    }
}

/// A complete backing store: the six collections plus settings.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> Backend;

    fn equipment(&self) -> &dyn Collection<Equipment>;

    fn records(&self) -> &dyn Collection<ServiceRecord>;

    fn inventory(&self) -> &dyn InventoryCollection;

    fn transactions(&self) -> &dyn Collection<StockTransaction>;

    fn sop_categories(&self) -> &dyn Collection<SopCategory>;

    fn sop_documents(&self) -> &dyn Collection<SopDocument>;

    fn settings(&self) -> &dyn SettingsStore;

    /// Verifies the backing is reachable.
    async fn ping(&self) -> Result<(), ServiceError>;
}

impl fmt::Debug for dyn Store + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Store").field(&self.backend()).finish()
    }
}

/// Explicitly constructed store handle, either connected or not.
#[derive(Clone)]
pub enum StoreHandle {
    Connected(Arc<dyn Store>),
    Disconnected(String),
}

impl StoreHandle {
    pub fn connected(store: impl Store + 'static) -> Self {
        StoreHandle::Connected(Arc::new(store))
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        StoreHandle::Disconnected(reason.into())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, StoreHandle::Connected(_))
    }

    /// The store, or `StorageUnavailable` when disconnected.
    pub fn require(&self) -> Result<&dyn Store, ServiceError> {
        match self {
            StoreHandle::Connected(store) => Ok(store.as_ref()),
            StoreHandle::Disconnected(reason) => Err(ServiceError::StorageUnavailable(format!(
                "not connected: {}",
                reason
            ))),
        }
    }

    /// Snapshot for health and sync-status reporting; pings the backing.
    pub async fn status(&self) -> ConnectionStatus {
        match self {
            StoreHandle::Connected(store) => match store.ping().await {
                Ok(()) => ConnectionStatus {
                    connected: true,
                    backend: Some(store.backend()),
                    message: "connected".to_string(),
                },
                Err(e) => ConnectionStatus {
                    connected: false,
                    backend: Some(store.backend()),
                    message: e.to_string(),
                },
            },
            StoreHandle::Disconnected(reason) => ConnectionStatus {
                connected: false,
                backend: None,
                message: format!("not connected: {}", reason),
            },
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreHandle::Connected(store) => f
                .debug_tuple("Connected")
                .field(&store.backend())
                .finish(),
            StoreHandle::Disconnected(reason) => {
                f.debug_tuple("Disconnected").field(reason).finish()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub backend: Option<Backend>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn disconnected_handle_refuses_access() {
        let handle = StoreHandle::disconnected("no backend configured");
        assert!(!handle.is_connected());
        assert_matches!(handle.require(), Err(ServiceError::StorageUnavailable(_)));

        let status = handle.status().await;
        assert!(!status.connected);
        assert!(status.message.starts_with("not connected"));
    }

    #[tokio::test]
    async fn connected_handle_reports_backend() {
        let handle = StoreHandle::connected(LocalStore::in_memory());
        let status = handle.status().await;
        assert!(status.connected);
        assert_eq!(status.backend, Some(Backend::Local));
    }
}
