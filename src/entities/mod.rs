//! sea-orm entities backing the SQL store, one per table.
//!
//! Each entity converts to and from its domain type in `crate::models`; the
//! SQL layout keeps quantities as integer hundredths and photos as JSON.

pub mod app_setting;
pub mod equipment;
pub mod inventory_item;
pub mod service_record;
pub mod sop_category;
pub mod sop_document;
pub mod stock_transaction;

use crate::errors::ServiceError;

pub(crate) fn column_overflow(column: &str, value: impl std::fmt::Display) -> ServiceError {
    ServiceError::SerializationError(format!("column {} holds out-of-range value {}", column, value))
}
