use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{PhotoAttachment, ServiceRecord};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub equipment_id: String,
    pub equipment_name: String,
    pub performed_date: Date,
    pub performed_by: String,
    pub notes: String,
    /// JSON array of photo attachments
    #[sea_orm(column_type = "Json")]
    pub photos: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ServiceRecord {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let photos: Vec<PhotoAttachment> = if model.photos.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(model.photos)?
        };
        Ok(ServiceRecord {
            id: model.id,
            equipment_id: model.equipment_id,
            equipment_name: model.equipment_name,
            performed_date: model.performed_date,
            performed_by: model.performed_by,
            notes: model.notes,
            photos,
        })
    }
}

impl From<ServiceRecord> for Model {
    fn from(record: ServiceRecord) -> Self {
        let photos = serde_json::to_value(&record.photos).unwrap_or_else(|_| Json::Array(Vec::new()));
        Model {
            id: record.id,
            equipment_id: record.equipment_id,
            equipment_name: record.equipment_name,
            performed_date: record.performed_date,
            performed_by: record.performed_by,
            notes: record.notes,
            photos,
        }
    }
}
