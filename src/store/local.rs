use async_trait::async_trait;
use chrono::DateTime;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use super::{Backend, Collection, InventoryCollection, OrderBy, SettingsStore, Store};
use crate::errors::ServiceError;
use crate::models::{
    AppSettings, Equipment, InventoryItem, ItemUpdate, Quantity, Record, ServiceRecord,
    SopCategory, SopDocument, StockTransaction,
};

/// Prefix of every key in the snapshot file.
const KEY_PREFIX: &str = "lubetrack_";
const SETTINGS_KEY: &str = "settings";

type Documents = BTreeMap<String, Value>;

struct LocalState {
    collections: DashMap<&'static str, Documents>,
    settings: std::sync::RwLock<AppSettings>,
    path: Option<PathBuf>,
    flush_lock: Mutex<()>,
}

impl LocalState {
    fn snapshot(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for entry in self.collections.iter() {
            let docs: Vec<Value> = entry.value().values().cloned().collect();
            out.insert(format!("{}{}", KEY_PREFIX, entry.key()), Value::Array(docs));
        }
        let settings = self
            .settings
            .read()
            .map(|s| *s)
            .unwrap_or_else(|poisoned| *poisoned.into_inner());
        out.insert(
            format!("{}{}", KEY_PREFIX, SETTINGS_KEY),
            serde_json::to_value(settings).unwrap_or(Value::Null),
        );
        out
    }

    /// Writes the full state to the snapshot file.
    ///
    /// Failures are logged and the in-memory write stands; the next
    /// successful flush writes everything again.
    async fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let _guard = self.flush_lock.lock().await;
        let body = match serde_json::to_vec(&Value::Object(self.snapshot())) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode local snapshot");
                return;
            }
        };
        let tmp = path.with_extension("tmp");
        let result = async {
            tokio::fs::write(&tmp, &body).await?;
            tokio::fs::rename(&tmp, path).await
        }
        .await;
        match result {
            Ok(()) => debug!(path = %path.display(), bytes = body.len(), "local snapshot written"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to write local snapshot"),
        }
    }
}

/// In-process document store keyed by collection name.
pub struct LocalStore {
    state: Arc<LocalState>,
    equipment: LocalCollection<Equipment>,
    records: LocalCollection<ServiceRecord>,
    inventory: LocalCollection<InventoryItem>,
    transactions: LocalCollection<StockTransaction>,
    sop_categories: LocalCollection<SopCategory>,
    sop_documents: LocalCollection<SopDocument>,
}

impl LocalStore {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::from_state(LocalState {
            collections: DashMap::new(),
            settings: std::sync::RwLock::new(AppSettings::default()),
            path: None,
            flush_lock: Mutex::new(()),
        })
    }

    /// Opens a store snapshotted to `path`, loading the file if it exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref().to_path_buf();
        let collections = DashMap::new();
        let mut settings = AppSettings::default();

        match tokio::fs::read(&path).await {
            Ok(raw) => {
                let snapshot: Map<String, Value> = serde_json::from_slice(&raw)?;
                for (key, value) in snapshot {
                    let Some(name) = key.strip_prefix(KEY_PREFIX) else {
                        continue;
                    };
                    if name == SETTINGS_KEY {
                        settings = serde_json::from_value(value)?;
                        continue;
                    }
                    let Some(collection) = known_collection(name) else {
                        debug!(key = %key, "skipping unknown snapshot key");
                        continue;
                    };
                    let docs = match value {
                        Value::Array(docs) => docs,
                        _ => {
                            return Err(ServiceError::SerializationError(format!(
                                "snapshot key {} is not an array",
                                key
                            )))
                        }
                    };
                    let mut by_id = Documents::new();
                    for doc in docs {
                        let id = doc
                            .get("id")
                            .and_then(Value::as_str)
                            .map(str::to_owned)
                            .ok_or_else(|| {
                                ServiceError::SerializationError(format!(
                                    "document in {} has no id",
                                    key
                                ))
                            })?;
                        by_id.insert(id, doc);
                    }
                    collections.insert(collection, by_id);
                }
                info!(path = %path.display(), "local store loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "local store starts empty");
            }
            Err(e) => {
                return Err(ServiceError::StorageUnavailable(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        Ok(Self::from_state(LocalState {
            collections,
            settings: std::sync::RwLock::new(settings),
            path: Some(path),
            flush_lock: Mutex::new(()),
        }))
    }

    fn from_state(state: LocalState) -> Self {
        let state = Arc::new(state);
        Self {
            equipment: LocalCollection::new(state.clone()),
            records: LocalCollection::new(state.clone()),
            inventory: LocalCollection::new(state.clone()),
            transactions: LocalCollection::new(state.clone()),
            sop_categories: LocalCollection::new(state.clone()),
            sop_documents: LocalCollection::new(state.clone()),
            state,
        }
    }
}

fn known_collection(name: &str) -> Option<&'static str> {
    [
        Equipment::COLLECTION,
        ServiceRecord::COLLECTION,
        InventoryItem::COLLECTION,
        StockTransaction::COLLECTION,
        SopCategory::COLLECTION,
        SopDocument::COLLECTION,
    ]
    .into_iter()
    .find(|known| *known == name)
}

#[async_trait]
impl Store for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn equipment(&self) -> &dyn Collection<Equipment> {
        &self.equipment
    }

    fn records(&self) -> &dyn Collection<ServiceRecord> {
        &self.records
    }

    fn inventory(&self) -> &dyn InventoryCollection {
        &self.inventory
    }

    fn transactions(&self) -> &dyn Collection<StockTransaction> {
        &self.transactions
    }

    fn sop_categories(&self) -> &dyn Collection<SopCategory> {
        &self.sop_categories
    }

    fn sop_documents(&self) -> &dyn Collection<SopDocument> {
        &self.sop_documents
    }

    fn settings(&self) -> &dyn SettingsStore {
        self
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for LocalStore {
    async fn load(&self) -> Result<AppSettings, ServiceError> {
        self.state
            .settings
            .read()
            .map(|s| *s)
            .map_err(|_| ServiceError::InternalError("settings lock poisoned".into()))
    }

    async fn save(&self, settings: AppSettings) -> Result<(), ServiceError> {
        {
            let mut current = self
                .state
                .settings
                .write()
                .map_err(|_| ServiceError::InternalError("settings lock poisoned".into()))?;
            *current = settings;
        }
        self.state.flush().await;
        Ok(())
    }
}

/// One collection of JSON documents inside a [`LocalStore`].
pub struct LocalCollection<T> {
    state: Arc<LocalState>,
    _record: PhantomData<fn() -> T>,
}

impl<T> LocalCollection<T> {
    fn new(state: Arc<LocalState>) -> Self {
        Self {
            state,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Record> Collection<T> for LocalCollection<T> {
    async fn list(&self, order_by: Option<&OrderBy>) -> Result<Vec<T>, ServiceError> {
        let mut docs: Vec<Value> = match self.state.collections.get(T::COLLECTION) {
            Some(coll) => coll.values().cloned().collect(),
            None => Vec::new(),
        };
        if let Some(order) = order_by {
            let key = camel_case(&order.field);
            docs.sort_by(|a, b| {
                let ord = compare_values(a.get(&key), b.get(&key));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(ServiceError::from))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<T>, ServiceError> {
        let doc = self
            .state
            .collections
            .get(T::COLLECTION)
            .and_then(|coll| coll.get(id).cloned());
        doc.map(|d| serde_json::from_value(d).map_err(ServiceError::from))
            .transpose()
    }

    #[instrument(skip(self, items), fields(collection = T::COLLECTION, count = items.len()))]
    async fn upsert(&self, items: Vec<T>) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Ok(());
        }
        let docs = items
            .iter()
            .map(|item| Ok((item.id().to_string(), serde_json::to_value(item)?)))
            .collect::<Result<Vec<_>, ServiceError>>()?;
        {
            let mut coll = self.state.collections.entry(T::COLLECTION).or_default();
            coll.extend(docs);
        }
        self.state.flush().await;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let removed = self
            .state
            .collections
            .get_mut(T::COLLECTION)
            .and_then(|mut coll| coll.remove(id))
            .is_some();
        if removed {
            self.state.flush().await;
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryCollection for LocalCollection<InventoryItem> {
    #[instrument(skip(self))]
    async fn adjust_stock(&self, id: &str, delta: Quantity) -> Result<InventoryItem, ServiceError> {
        let updated = {
            // the entry guard serializes concurrent adjustments
            let mut coll = self
                .state
                .collections
                .get_mut(InventoryItem::COLLECTION)
                .ok_or_else(|| ServiceError::item_not_found(id))?;
            let doc = coll
                .get_mut(id)
                .ok_or_else(|| ServiceError::item_not_found(id))?;
            let mut item: InventoryItem = serde_json::from_value(doc.clone())?;
            item.stock = item.stock.checked_add(delta).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "adjusting stock of {} by {} exceeds the maximum of {}",
                    id,
                    delta,
                    Quantity::MAX
                ))
            })?;
            *doc = serde_json::to_value(&item)?;
            item
        };
        self.state.flush().await;
        Ok(updated)
    }

    #[instrument(skip(self, details))]
    async fn update_details(
        &self,
        id: &str,
        details: &ItemUpdate,
    ) -> Result<InventoryItem, ServiceError> {
        let updated = {
            let mut coll = self
                .state
                .collections
                .get_mut(InventoryItem::COLLECTION)
                .ok_or_else(|| ServiceError::item_not_found(id))?;
            let doc = coll
                .get_mut(id)
                .ok_or_else(|| ServiceError::item_not_found(id))?;
            let mut item: InventoryItem = serde_json::from_value(doc.clone())?;
            item.name = details.name.clone();
            item.item_type = details.item_type.clone();
            item.unit = details.unit.clone();
            item.min_threshold = details.min_threshold;
            *doc = serde_json::to_value(&item)?;
            item
        };
        self.state.flush().await;
        Ok(updated)
    }
}

/// `next_service_date` -> `nextServiceDate`
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Missing and null values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // RFC 3339 text varies in fraction digits, so instants compare parsed
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
