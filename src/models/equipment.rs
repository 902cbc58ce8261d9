use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Record;
use crate::schedule::{classify_status, ServiceStatus};

/// A lubricated asset and its service schedule.
///
/// `next_service_date` is always `last_service_date + cycle_days` except right
/// after a task completion where the technician overrode the suggested date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub location: String,
    pub lubricant: String,
    pub cycle_days: u32,
    pub last_service_date: NaiveDate,
    pub next_service_date: NaiveDate,
    pub capacity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Equipment {
    pub fn status(&self, today: NaiveDate) -> ServiceStatus {
        classify_status(self.next_service_date, today)
    }

    /// Case-insensitive match on name, location and type.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self.location.to_lowercase().contains(&term)
            || self.equipment_type.to_lowercase().contains(&term)
    }
}

impl Record for Equipment {
    const COLLECTION: &'static str = "equipment";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create-or-update payload; the next service date is always derived.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentInput {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(rename = "type", default)]
    pub equipment_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub lubricant: String,
    #[validate(range(min = 1))]
    pub cycle_days: u32,
    pub last_service_date: NaiveDate,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub notes: Option<String>,
}
