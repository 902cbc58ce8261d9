use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{Direction, Quantity, StockTransaction};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub inventory_id: String,
    pub inventory_name: String,
    /// "IN" or "OUT"
    pub direction: String,
    pub amount_hundredths: i64,
    pub timestamp: DateTimeUtc,
    pub user_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StockTransaction {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(StockTransaction {
            id: model.id,
            inventory_id: model.inventory_id,
            inventory_name: model.inventory_name,
            direction: model.direction.parse::<Direction>()?,
            amount: Quantity::from_hundredths(model.amount_hundredths),
            timestamp: model.timestamp,
            user: model.user_name,
        })
    }
}

impl From<StockTransaction> for Model {
    fn from(tx: StockTransaction) -> Self {
        Model {
            id: tx.id,
            inventory_id: tx.inventory_id,
            inventory_name: tx.inventory_name,
            direction: tx.direction.as_str().to_string(),
            amount_hundredths: tx.amount.hundredths(),
            timestamp: tx.timestamp,
            user_name: tx.user,
        }
    }
}
