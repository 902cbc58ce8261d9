use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{InventoryItem, Quantity};

/// Quantities are stored as integer hundredths so `stock = stock + delta`
/// stays exact when the database applies it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub item_type: String,
    pub stock_hundredths: i64,
    pub opening_stock_hundredths: i64,
    pub unit: String,
    pub min_threshold_hundredths: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for InventoryItem {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            id: model.id,
            name: model.name,
            item_type: model.item_type,
            stock: Quantity::from_hundredths(model.stock_hundredths),
            opening_stock: Quantity::from_hundredths(model.opening_stock_hundredths),
            unit: model.unit,
            min_threshold: Quantity::from_hundredths(model.min_threshold_hundredths),
        })
    }
}

impl From<InventoryItem> for Model {
    fn from(item: InventoryItem) -> Self {
        Model {
            id: item.id,
            name: item.name,
            item_type: item.item_type,
            stock_hundredths: item.stock.hundredths(),
            opening_stock_hundredths: item.opening_stock.hundredths(),
            unit: item.unit,
            min_threshold_hundredths: item.min_threshold.hundredths(),
        }
    }
}
