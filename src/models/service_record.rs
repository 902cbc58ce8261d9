use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Record;

/// Encoded image attached to exactly one service record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAttachment {
    pub id: String,
    /// Data URL of the already-compressed image
    pub data_url: String,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Completed lubrication task.
///
/// `equipment_name` is a snapshot taken at completion time and is never
/// refreshed from the equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub equipment_id: String,
    pub equipment_name: String,
    pub performed_date: NaiveDate,
    pub performed_by: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<PhotoAttachment>,
}

impl Record for ServiceRecord {
    const COLLECTION: &'static str = "records";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskInput {
    pub performed_date: NaiveDate,
    /// Overrides the computed next service date when present
    #[serde(default)]
    pub next_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[validate(length(min = 1, max = 100))]
    pub performed_by: String,
    #[serde(default)]
    pub photos: Vec<PhotoAttachment>,
}

/// Manual correction of a record; the equipment snapshot is kept.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    pub performed_date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub performed_by: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<PhotoAttachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    pub equipment_id: Option<String>,
}
