use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::column_overflow;
use crate::errors::ServiceError;
use crate::models::AppSettings;

/// Id of the single settings row.
pub const SETTINGS_ROW: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub photo_retention_days: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AppSettings {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let photo_retention_days = u32::try_from(model.photo_retention_days)
            .map_err(|_| column_overflow("photo_retention_days", model.photo_retention_days))?;
        Ok(AppSettings { photo_retention_days })
    }
}

impl From<AppSettings> for Model {
    fn from(settings: AppSettings) -> Self {
        Model {
            id: SETTINGS_ROW,
            photo_retention_days: i32::try_from(settings.photo_retention_days).unwrap_or(i32::MAX),
        }
    }
}
