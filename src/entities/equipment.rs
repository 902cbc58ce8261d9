use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::column_overflow;
use crate::errors::ServiceError;
use crate::models::Equipment;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "equipment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub equipment_type: String,
    pub location: String,
    pub lubricant: String,
    pub cycle_days: i32,
    pub last_service_date: Date,
    pub next_service_date: Date,
    pub capacity: String,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Equipment {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let cycle_days =
            u32::try_from(model.cycle_days).map_err(|_| column_overflow("cycle_days", model.cycle_days))?;
        Ok(Equipment {
            id: model.id,
            name: model.name,
            equipment_type: model.equipment_type,
            location: model.location,
            lubricant: model.lubricant,
            cycle_days,
            last_service_date: model.last_service_date,
            next_service_date: model.next_service_date,
            capacity: model.capacity,
            notes: model.notes,
        })
    }
}

impl From<Equipment> for Model {
    fn from(eq: Equipment) -> Self {
        Model {
            id: eq.id,
            name: eq.name,
            equipment_type: eq.equipment_type,
            location: eq.location,
            lubricant: eq.lubricant,
            // cycle lengths beyond i32::MAX days cannot produce a valid next date
            cycle_days: i32::try_from(eq.cycle_days).unwrap_or(i32::MAX),
            last_service_date: eq.last_service_date,
            next_service_date: eq.next_service_date,
            capacity: eq.capacity,
            notes: eq.notes,
        }
    }
}
