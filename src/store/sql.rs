use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IdenStatic, IntoActiveModel,
    Iterable, PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder,
};
use std::marker::PhantomData;
use std::str::FromStr;
use tracing::{info, instrument};

use super::{Backend, Collection, InventoryCollection, OrderBy, SettingsStore, Store};
use crate::db::{self, DbConfig};
use crate::entities::{
    app_setting, equipment, inventory_item, service_record, sop_category, sop_document,
    stock_transaction,
};
use crate::errors::ServiceError;
use crate::models::{
    AppSettings, Equipment, InventoryItem, ItemUpdate, Quantity, Record, ServiceRecord,
    SopCategory, SopDocument, StockTransaction,
};

/// Relational backing over a sea-orm connection pool.
pub struct SqlStore {
    db: DatabaseConnection,
    equipment: SqlCollection<equipment::Entity>,
    records: SqlCollection<service_record::Entity>,
    inventory: SqlCollection<inventory_item::Entity>,
    transactions: SqlCollection<stock_transaction::Entity>,
    sop_categories: SqlCollection<sop_category::Entity>,
    sop_documents: SqlCollection<sop_document::Entity>,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            equipment: SqlCollection::new(db.clone()),
            records: SqlCollection::new(db.clone()),
            inventory: SqlCollection::new(db.clone()),
            transactions: SqlCollection::new(db.clone()),
            sop_categories: SqlCollection::new(db.clone()),
            sop_documents: SqlCollection::new(db.clone()),
            db,
        }
    }

    /// Connects with `config` and, when `migrate` is set, brings the schema up to date.
    pub async fn connect(config: &DbConfig, migrate: bool) -> Result<Self, ServiceError> {
        let pool = db::establish_connection(config).await.map_err(|e| {
            ServiceError::StorageUnavailable(format!("database connection failed: {}", e))
        })?;
        if migrate {
            db::run_migrations(&pool).await?;
        }
        info!("sql store ready");
        Ok(Self::new(pool))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Store for SqlStore {
    fn backend(&self) -> Backend {
        Backend::Sql
    }

    fn equipment(&self) -> &dyn Collection<Equipment> {
        &self.equipment
    }

    fn records(&self) -> &dyn Collection<ServiceRecord> {
        &self.records
    }

    fn inventory(&self) -> &dyn InventoryCollection {
        &self.inventory
    }

    fn transactions(&self) -> &dyn Collection<StockTransaction> {
        &self.transactions
    }

    fn sop_categories(&self) -> &dyn Collection<SopCategory> {
        &self.sop_categories
    }

    fn sop_documents(&self) -> &dyn Collection<SopDocument> {
        &self.sop_documents
    }

    fn settings(&self) -> &dyn SettingsStore {
        self
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        db::check_connection(&self.db)
            .await
            .map_err(|e| ServiceError::StorageUnavailable(e.to_string()))
    }
}

#[async_trait]
impl SettingsStore for SqlStore {
    async fn load(&self) -> Result<AppSettings, ServiceError> {
        match app_setting::Entity::find_by_id(app_setting::SETTINGS_ROW)
            .one(&self.db)
            .await?
        {
            Some(model) => AppSettings::try_from(model),
            None => Ok(AppSettings::default()),
        }
    }

    #[instrument(skip(self))]
    async fn save(&self, settings: AppSettings) -> Result<(), ServiceError> {
        let model = app_setting::Model::from(settings);
        app_setting::Entity::insert(model.into_active_model())
            .on_conflict(
                OnConflict::column(app_setting::Column::Id)
                    .update_column(app_setting::Column::PhotoRetentionDays)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

/// One table exposed as a [`Collection`] of its domain type.
pub struct SqlCollection<E> {
    db: DatabaseConnection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SqlCollection<E> {
    fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

fn primary_key_columns<E: EntityTrait>() -> Vec<E::Column> {
    E::PrimaryKey::iter().map(|pk| pk.into_column()).collect()
}

#[async_trait]
impl<E, T> Collection<T> for SqlCollection<E>
where
    E: EntityTrait,
    E::Model: From<T> + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send + Sync,
    T: Record + TryFrom<E::Model, Error = ServiceError>,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<String>,
{
    async fn list(&self, order_by: Option<&OrderBy>) -> Result<Vec<T>, ServiceError> {
        let mut query = E::find();
        if let Some(order) = order_by {
            let column = E::Column::from_str(&order.field).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "cannot order {} by unknown field {}",
                    T::COLLECTION,
                    order.field
                ))
            })?;
            query = if order.descending {
                query.order_by_desc(column)
            } else {
                query.order_by_asc(column)
            };
        }
        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(T::try_from)
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<T>, ServiceError> {
        E::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(T::try_from)
            .transpose()
    }

    #[instrument(skip(self, items), fields(collection = T::COLLECTION, count = items.len()))]
    async fn upsert(&self, items: Vec<T>) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Ok(());
        }
        let keys = primary_key_columns::<E>();
        let key_names: Vec<String> = keys.iter().map(|c| c.as_str().to_owned()).collect();
        let updates: Vec<E::Column> = E::Column::iter()
            .filter(|c| !key_names.iter().any(|k| k == c.as_str()))
            .collect();

        let models = items
            .into_iter()
            .map(|item| E::Model::from(item).into_active_model());
        E::insert_many(models)
            .on_conflict(OnConflict::columns(keys).update_columns(updates).to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION))]
    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        E::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryCollection for SqlCollection<inventory_item::Entity> {
    #[instrument(skip(self))]
    async fn adjust_stock(&self, id: &str, delta: Quantity) -> Result<InventoryItem, ServiceError> {
        let limit = Quantity::MAX.hundredths();
        let next = || Expr::col(inventory_item::Column::StockHundredths).add(delta.hundredths());
        // one UPDATE statement; stock is never read back before the write
        let result = inventory_item::Entity::update_many()
            .col_expr(inventory_item::Column::StockHundredths, next())
            .filter(inventory_item::Column::Id.eq(id))
            .filter(Expr::expr(next()).lte(limit))
            .filter(Expr::expr(next()).gte(-limit))
            .exec(&self.db)
            .await?;
        let item = <Self as Collection<InventoryItem>>::get(self, id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(id))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ValidationError(format!(
                "adjusting stock of {} by {} exceeds the maximum of {}",
                id,
                delta,
                Quantity::MAX
            )));
        }
        Ok(item)
    }

    #[instrument(skip(self, details))]
    async fn update_details(
        &self,
        id: &str,
        details: &ItemUpdate,
    ) -> Result<InventoryItem, ServiceError> {
        let result = inventory_item::Entity::update_many()
            .col_expr(inventory_item::Column::Name, Expr::value(details.name.clone()))
            .col_expr(
                inventory_item::Column::ItemType,
                Expr::value(details.item_type.clone()),
            )
            .col_expr(inventory_item::Column::Unit, Expr::value(details.unit.clone()))
            .col_expr(
                inventory_item::Column::MinThresholdHundredths,
                Expr::value(details.min_threshold.hundredths()),
            )
            .filter(inventory_item::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::item_not_found(id));
        }
        <Self as Collection<InventoryItem>>::get(self, id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(id))
    }
}
