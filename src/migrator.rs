use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_equipment_tables::Migration),
            Box::new(m20240101_000002_create_inventory_tables::Migration),
            Box::new(m20240101_000003_create_sop_tables::Migration),
            Box::new(m20240101_000004_create_app_settings_table::Migration),
        ]
    }
}

mod m20240101_000001_create_equipment_tables {

    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Equipment::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Equipment::Id).string().not_null().primary_key())
                        .col(ColumnDef::new(Equipment::Name).string().not_null())
                        .col(ColumnDef::new(Equipment::EquipmentType).string().not_null())
                        .col(ColumnDef::new(Equipment::Location).string().not_null())
                        .col(ColumnDef::new(Equipment::Lubricant).string().not_null())
                        .col(ColumnDef::new(Equipment::CycleDays).integer().not_null())
                        .col(ColumnDef::new(Equipment::LastServiceDate).date().not_null())
                        .col(ColumnDef::new(Equipment::NextServiceDate).date().not_null())
                        .col(ColumnDef::new(Equipment::Capacity).string().not_null())
                        .col(ColumnDef::new(Equipment::Notes).text().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_equipment_next_service_date")
                        .table(Equipment::Table)
                        .col(Equipment::NextServiceDate)
                        .to_owned(),
                )
                .await?;

            // No foreign key to equipment: records outlive the equipment they name.
            manager
                .create_table(
                    Table::create()
                        .table(ServiceRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceRecords::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ServiceRecords::EquipmentId).string().not_null())
                        .col(ColumnDef::new(ServiceRecords::EquipmentName).string().not_null())
                        .col(ColumnDef::new(ServiceRecords::PerformedDate).date().not_null())
                        .col(ColumnDef::new(ServiceRecords::PerformedBy).string().not_null())
                        .col(
                            ColumnDef::new(ServiceRecords::Notes)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(ServiceRecords::Photos).json().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_records_equipment_id")
                        .table(ServiceRecords::Table)
                        .col(ServiceRecords::EquipmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Equipment::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Equipment {
        Table,
        Id,
        Name,
        EquipmentType,
        Location,
        Lubricant,
        CycleDays,
        LastServiceDate,
        NextServiceDate,
        Capacity,
        Notes,
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceRecords {
        Table,
        Id,
        EquipmentId,
        EquipmentName,
        PerformedDate,
        PerformedBy,
        Notes,
        Photos,
    }
}

mod m20240101_000002_create_inventory_tables {

    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::ItemType).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::StockHundredths)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::OpeningStockHundredths)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::Unit).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::MinThresholdHundredths)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockTransactions::InventoryId).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::InventoryName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::Direction).string().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::AmountHundredths)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::UserName).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_inventory_id")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::InventoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_timestamp")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::Timestamp)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryItems {
        Table,
        Id,
        Name,
        ItemType,
        StockHundredths,
        OpeningStockHundredths,
        Unit,
        MinThresholdHundredths,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTransactions {
        Table,
        Id,
        InventoryId,
        InventoryName,
        Direction,
        AmountHundredths,
        Timestamp,
        UserName,
    }
}

mod m20240101_000003_create_sop_tables {

    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SopCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SopCategories::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SopCategories::Name).string().not_null())
                        .col(ColumnDef::new(SopCategories::Description).text().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SopDocuments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SopDocuments::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SopDocuments::CategoryId).string().not_null())
                        .col(ColumnDef::new(SopDocuments::Title).string().not_null())
                        .col(ColumnDef::new(SopDocuments::Content).text().not_null())
                        .col(ColumnDef::new(SopDocuments::UpdatedAt).date().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sop_documents_category_id")
                        .table(SopDocuments::Table)
                        .col(SopDocuments::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SopDocuments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SopCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SopCategories {
        Table,
        Id,
        Name,
        Description,
    }

    #[derive(DeriveIden)]
    pub(super) enum SopDocuments {
        Table,
        Id,
        CategoryId,
        Title,
        Content,
        UpdatedAt,
    }
}

mod m20240101_000004_create_app_settings_table {

    use sea_orm_migration::prelude::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AppSettings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AppSettings::Id).integer().not_null().primary_key())
                        .col(
                            ColumnDef::new(AppSettings::PhotoRetentionDays)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AppSettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AppSettings {
        Table,
        Id,
        PhotoRetentionDays,
    }
}
