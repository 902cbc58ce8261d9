use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::SopDocument;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sop_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub updated_at: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SopDocument {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(SopDocument {
            id: model.id,
            category_id: model.category_id,
            title: model.title,
            content: model.content,
            updated_at: model.updated_at,
        })
    }
}

impl From<SopDocument> for Model {
    fn from(doc: SopDocument) -> Self {
        Model {
            id: doc.id,
            category_id: doc.category_id,
            title: doc.title,
            content: doc.content,
            updated_at: doc.updated_at,
        }
    }
}
