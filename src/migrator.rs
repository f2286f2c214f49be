use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_products_table::Migration),
            Box::new(m20240115_000002_create_inventory_batches_table::Migration),
            Box::new(m20240115_000003_create_sales_snapshots_table::Migration),
            Box::new(m20240115_000004_create_sales_consumptions_table::Migration),
            Box::new(m20240115_000005_create_warehouse_snapshots_table::Migration),
            Box::new(m20240115_000006_create_sales_records_table::Migration),
            Box::new(m20240115_000007_create_shipments_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240115_000001_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TeamId).uuid().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_team_id")
                        .table(Products::Table)
                        .col(Products::TeamId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_team_sku")
                        .table(Products::Table)
                        .col(Products::TeamId)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        TeamId,
        Sku,
        Name,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240115_000002_create_inventory_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000002_create_inventory_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryBatches::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::LocationType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::UnitShippingCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryBatches::SourcePurchaseOrderId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryBatches::Notes).string().null())
                        .col(
                            ColumnDef::new(InventoryBatches::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The FIFO walk reads (product, location) ordered by created_at
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_batches_product_location_created")
                        .table(InventoryBatches::Table)
                        .col(InventoryBatches::ProductId)
                        .col(InventoryBatches::LocationType)
                        .col(InventoryBatches::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_batches_source_po")
                        .table(InventoryBatches::Table)
                        .col(InventoryBatches::SourcePurchaseOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryBatches {
        Table,
        Id,
        ProductId,
        LocationType,
        Quantity,
        UnitCost,
        UnitShippingCost,
        SourcePurchaseOrderId,
        Notes,
        CreatedAt,
    }
}

mod m20240115_000003_create_sales_snapshots_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000003_create_sales_snapshots_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesSnapshots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesSnapshots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesSnapshots::TeamId).uuid().not_null())
                        .col(ColumnDef::new(SalesSnapshots::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesSnapshots::PeriodStart)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesSnapshots::PeriodEnd).date().not_null())
                        .col(
                            ColumnDef::new(SalesSnapshots::UnitsSold)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesSnapshots::Revenue).decimal().null())
                        .col(
                            ColumnDef::new(SalesSnapshots::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One snapshot per (team, product, period)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_snapshots_team_product_period")
                        .table(SalesSnapshots::Table)
                        .col(SalesSnapshots::TeamId)
                        .col(SalesSnapshots::ProductId)
                        .col(SalesSnapshots::PeriodStart)
                        .col(SalesSnapshots::PeriodEnd)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesSnapshots::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesSnapshots {
        Table,
        Id,
        TeamId,
        ProductId,
        PeriodStart,
        PeriodEnd,
        UnitsSold,
        Revenue,
        CreatedAt,
    }
}

mod m20240115_000004_create_sales_consumptions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000004_create_sales_consumptions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesConsumptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesConsumptions::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::SnapshotId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::BatchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::LocationType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::UnitCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::UnitShippingCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::BatchCreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesConsumptions::ConsumedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_consumptions_snapshot_id")
                        .table(SalesConsumptions::Table)
                        .col(SalesConsumptions::SnapshotId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesConsumptions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesConsumptions {
        Table,
        Id,
        SnapshotId,
        BatchId,
        LocationType,
        Quantity,
        UnitCost,
        UnitShippingCost,
        BatchCreatedAt,
        ConsumedAt,
    }
}

mod m20240115_000005_create_warehouse_snapshots_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000005_create_warehouse_snapshots_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseSnapshots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseSnapshots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseSnapshots::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseSnapshots::SnapshotDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseSnapshots::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseSnapshots::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseSnapshots::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Neighbor lookups walk (product, date); one count per day
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_snapshots_product_date")
                        .table(WarehouseSnapshots::Table)
                        .col(WarehouseSnapshots::ProductId)
                        .col(WarehouseSnapshots::SnapshotDate)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseSnapshots::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum WarehouseSnapshots {
        Table,
        Id,
        ProductId,
        SnapshotDate,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240115_000006_create_sales_records_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000006_create_sales_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesRecords::ProductId).uuid().not_null())
                        .col(ColumnDef::new(SalesRecords::StartDate).date().not_null())
                        .col(ColumnDef::new(SalesRecords::EndDate).date().not_null())
                        .col(ColumnDef::new(SalesRecords::UnitsSold).integer().not_null())
                        .col(
                            ColumnDef::new(SalesRecords::StartingInventory)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesRecords::EndingInventory)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesRecords::UnitsReceived)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesRecords::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(SalesRecords::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_records_product_period")
                        .table(SalesRecords::Table)
                        .col(SalesRecords::ProductId)
                        .col(SalesRecords::StartDate)
                        .col(SalesRecords::EndDate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Delete cascade looks records up by their end date
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_records_product_end_date")
                        .table(SalesRecords::Table)
                        .col(SalesRecords::ProductId)
                        .col(SalesRecords::EndDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SalesRecords {
        Table,
        Id,
        ProductId,
        StartDate,
        EndDate,
        UnitsSold,
        StartingInventory,
        EndingInventory,
        UnitsReceived,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240115_000007_create_shipments_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000007_create_shipments_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::TeamId).uuid().not_null())
                        .col(
                            ColumnDef::new(Shipments::InvoiceNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Shipments::ShippingDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::DeliveredAt).timestamp().null())
                        .col(ColumnDef::new(Shipments::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_team_invoice")
                        .table(Shipments::Table)
                        .col(Shipments::TeamId)
                        .col(Shipments::InvoiceNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_shipping_date")
                        .table(Shipments::Table)
                        .col(Shipments::ShippingDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentLines::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentLines::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(ShipmentLines::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ShipmentLines::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentLines::ShippedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_lines_shipment_id")
                        .table(ShipmentLines::Table)
                        .col(ShipmentLines::ShipmentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_lines_product_id")
                        .table(ShipmentLines::Table)
                        .col(ShipmentLines::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Shipments {
        Table,
        Id,
        TeamId,
        InvoiceNumber,
        Status,
        ShippingDate,
        DeliveredAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ShipmentLines {
        Table,
        Id,
        ShipmentId,
        ProductId,
        Quantity,
        ShippedQuantity,
    }
}
