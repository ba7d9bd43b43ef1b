use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_tenancy_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_bom_tables::Migration),
            Box::new(m20240301_000004_create_ledger_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_tenancy_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_tenancy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Companies::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Companies::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Companies::Name).string().not_null())
                        .col(
                            ColumnDef::new(Companies::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TenantSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TenantSettings::CompanyId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::ReorderWarningMultiplier)
                                .decimal_len(5, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::ForecastLookbackDays)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::ForecastSafetyDays)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::LotExpiryWarningDays)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::AllowNegativeInventory)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantSettings::AlertsEnabled)
                                .boolean()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TenantSettings::SlackWebhookUrl).string().null())
                        .col(ColumnDef::new(TenantSettings::AlertEmail).string().null())
                        .col(
                            ColumnDef::new(TenantSettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(TenantSettings::Table, TenantSettings::CompanyId)
                                .to(Companies::Table, Companies::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(ColumnDef::new(Users::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Users::Table, Users::CompanyId)
                                .to(Companies::Table, Companies::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TenantSettings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Companies::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Companies {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum TenantSettings {
        Table,
        CompanyId,
        ReorderWarningMultiplier,
        ForecastLookbackDays,
        ForecastSafetyDays,
        LotExpiryWarningDays,
        AllowNegativeInventory,
        AlertsEnabled,
        SlackWebhookUrl,
        AlertEmail,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        CompanyId,
        Email,
        PasswordHash,
        Role,
        Active,
        CreatedAt,
    }
}

mod m20240301_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Components::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Components::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Components::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Components::Code).string().not_null())
                        .col(ColumnDef::new(Components::Name).string().not_null())
                        .col(ColumnDef::new(Components::UnitOfMeasure).string().not_null())
                        .col(
                            ColumnDef::new(Components::CostPerUnit)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Components::ReorderPoint)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Components::LeadTimeDays)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Components::LotTracked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Components::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Components::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Components::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_components_company_code")
                        .table(Components::Table)
                        .col(Components::CompanyId)
                        .col(Components::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Locations::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::Kind).string().not_null())
                        .col(
                            ColumnDef::new(Locations::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Locations::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Locations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_locations_company_name")
                        .table(Locations::Table)
                        .col(Locations::CompanyId)
                        .col(Locations::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Lots::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Lots::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Lots::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Lots::ComponentId).uuid().not_null())
                        .col(ColumnDef::new(Lots::LotCode).string().not_null())
                        .col(ColumnDef::new(Lots::ExpiryDate).date().null())
                        .col(ColumnDef::new(Lots::Supplier).string().null())
                        .col(
                            ColumnDef::new(Lots::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Lots::Quantity).big_integer().not_null().default(0))
                        .col(ColumnDef::new(Lots::Active).boolean().not_null().default(true))
                        .foreign_key(
                            ForeignKey::create()
                                .from(Lots::Table, Lots::ComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_lots_company_component_code")
                        .table(Lots::Table)
                        .col(Lots::CompanyId)
                        .col(Lots::ComponentId)
                        .col(Lots::LotCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Brands::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Brands::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Brands::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Brands::Name).string().not_null())
                        .col(ColumnDef::new(Brands::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Brands::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_brands_company_name")
                        .table(Brands::Table)
                        .col(Brands::CompanyId)
                        .col(Brands::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Skus::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Skus::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Skus::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Skus::BrandId).uuid().null())
                        .col(ColumnDef::new(Skus::Code).string().not_null())
                        .col(ColumnDef::new(Skus::Name).string().not_null())
                        .col(ColumnDef::new(Skus::FinishedComponentId).uuid().null())
                        .col(ColumnDef::new(Skus::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Skus::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Skus::Table, Skus::BrandId)
                                .to(Brands::Table, Brands::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(Skus::Table, Skus::FinishedComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_skus_company_code")
                        .table(Skus::Table)
                        .col(Skus::CompanyId)
                        .col(Skus::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Skus::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Brands::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Lots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Components::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Components {
        Table,
        Id,
        CompanyId,
        Code,
        Name,
        UnitOfMeasure,
        CostPerUnit,
        ReorderPoint,
        LeadTimeDays,
        LotTracked,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        CompanyId,
        Name,
        Kind,
        IsDefault,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Lots {
        Table,
        Id,
        CompanyId,
        ComponentId,
        LotCode,
        ExpiryDate,
        Supplier,
        ReceivedAt,
        Quantity,
        Active,
    }

    #[derive(DeriveIden)]
    pub(super) enum Brands {
        Table,
        Id,
        CompanyId,
        Name,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Skus {
        Table,
        Id,
        CompanyId,
        BrandId,
        Code,
        Name,
        FinishedComponentId,
        Active,
        CreatedAt,
    }
}

mod m20240301_000003_create_bom_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240301_000002_create_catalog_tables::{Components, Skus};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_bom_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BomVersions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BomVersions::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(BomVersions::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(BomVersions::SkuId).uuid().not_null())
                        .col(ColumnDef::new(BomVersions::VersionNumber).integer().not_null())
                        .col(ColumnDef::new(BomVersions::Status).string().not_null())
                        .col(
                            ColumnDef::new(BomVersions::EffectiveStart)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(BomVersions::EffectiveEnd)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(BomVersions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(BomVersions::Table, BomVersions::SkuId)
                                .to(Skus::Table, Skus::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_bom_versions_company_sku_version")
                        .table(BomVersions::Table)
                        .col(BomVersions::CompanyId)
                        .col(BomVersions::SkuId)
                        .col(BomVersions::VersionNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BomLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BomLines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(BomLines::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(BomLines::BomVersionId).uuid().not_null())
                        .col(ColumnDef::new(BomLines::ComponentId).uuid().not_null())
                        .col(
                            ColumnDef::new(BomLines::QuantityPerUnit)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(BomLines::Table, BomLines::BomVersionId)
                                .to(BomVersions::Table, BomVersions::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(BomLines::Table, BomLines::ComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_bom_lines_version")
                        .table(BomLines::Table)
                        .col(BomLines::BomVersionId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BomVersions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum BomVersions {
        Table,
        Id,
        CompanyId,
        SkuId,
        VersionNumber,
        Status,
        EffectiveStart,
        EffectiveEnd,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum BomLines {
        Table,
        Id,
        CompanyId,
        BomVersionId,
        ComponentId,
        QuantityPerUnit,
    }
}

mod m20240301_000004_create_ledger_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240301_000002_create_catalog_tables::{Components, Locations, Lots};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::CompanyId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryTransactions::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::SkuId).uuid().null())
                        .col(ColumnDef::new(InventoryTransactions::Units).big_integer().null())
                        .col(ColumnDef::new(InventoryTransactions::ReasonCode).string().null())
                        .col(ColumnDef::new(InventoryTransactions::Reference).string().null())
                        .col(ColumnDef::new(InventoryTransactions::Notes).text().null())
                        .col(ColumnDef::new(InventoryTransactions::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_transactions_company_created")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::CompanyId)
                        .col(InventoryTransactions::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransactionLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionLines::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(TransactionLines::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(TransactionLines::ComponentId).uuid().not_null())
                        .col(ColumnDef::new(TransactionLines::LocationId).uuid().not_null())
                        .col(ColumnDef::new(TransactionLines::LotId).uuid().null())
                        .col(
                            ColumnDef::new(TransactionLines::QuantityChange)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionLines::UnitCostSnapshot)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(TransactionLines::Table, TransactionLines::TransactionId)
                                .to(InventoryTransactions::Table, InventoryTransactions::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(TransactionLines::Table, TransactionLines::ComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(TransactionLines::Table, TransactionLines::LocationId)
                                .to(Locations::Table, Locations::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(TransactionLines::Table, TransactionLines::LotId)
                                .to(Lots::Table, Lots::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transaction_lines_component_location")
                        .table(TransactionLines::Table)
                        .col(TransactionLines::CompanyId)
                        .col(TransactionLines::ComponentId)
                        .col(TransactionLines::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transaction_lines_transaction")
                        .table(TransactionLines::Table)
                        .col(TransactionLines::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockBalances::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockBalances::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(StockBalances::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(StockBalances::ComponentId).uuid().not_null())
                        .col(ColumnDef::new(StockBalances::LocationId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockBalances::OnHand)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockBalances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(StockBalances::Table, StockBalances::ComponentId)
                                .to(Components::Table, Components::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(StockBalances::Table, StockBalances::LocationId)
                                .to(Locations::Table, Locations::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_balances_company_component_location")
                        .table(StockBalances::Table)
                        .col(StockBalances::CompanyId)
                        .col(StockBalances::ComponentId)
                        .col(StockBalances::LocationId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockBalances::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransactionLines::Table).to_owned())
                .await?;
            manager
                .drop_table(
                    Table::drop()
                        .table(InventoryTransactions::Table)
                        .to_owned(),
                )
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryTransactions {
        Table,
        Id,
        CompanyId,
        TransactionType,
        SkuId,
        Units,
        ReasonCode,
        Reference,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum TransactionLines {
        Table,
        Id,
        CompanyId,
        TransactionId,
        ComponentId,
        LocationId,
        LotId,
        QuantityChange,
        UnitCostSnapshot,
    }

    #[derive(DeriveIden)]
    enum StockBalances {
        Table,
        Id,
        CompanyId,
        ComponentId,
        LocationId,
        OnHand,
        UpdatedAt,
    }
}
