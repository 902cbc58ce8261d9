//! Domain records shared by the services, the stores and the HTTP layer.

use serde::{de::DeserializeOwned, Serialize};

pub mod equipment;
pub mod inventory;
pub mod service_record;
pub mod settings;
pub mod sop;

pub use equipment::{Equipment, EquipmentInput};
pub use inventory::{
    Direction, InventoryItem, ItemUpdate, LedgerReport, NewItem, NewTransaction, Quantity,
    StockTransaction, TransactionFilter,
};
pub use service_record::{
    CompleteTaskInput, PhotoAttachment, RecordFilter, RecordUpdate, ServiceRecord,
};
pub use settings::AppSettings;
pub use sop::{SopCategory, SopCategoryInput, SopDocument, SopDocumentInput};

/// A persisted entity addressed by a string id within one named collection.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection name, also the key used by the local store.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Returns the supplied id, or a fresh UUID when it is absent or blank.
pub(crate) fn id_or_new(id: Option<String>) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
