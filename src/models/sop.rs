use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SopCategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record for SopCategory {
    const COLLECTION: &'static str = "sop_categories";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Standard operating procedure text filed under one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SopDocument {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub content: String,
    pub updated_at: NaiveDate,
}

impl Record for SopDocument {
    const COLLECTION: &'static str = "sop_documents";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SopCategoryInput {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SopDocumentInput {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1))]
    pub category_id: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default)]
    pub content: String,
}
