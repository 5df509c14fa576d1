//! Migration to create the va_data_provider_configs table.
//!
//! Holds per-VA data provider connection parameters and the entity schema
//! document. Only one active row per (va_id, provider_type) is honoured, and
//! that rule is applied at query time rather than through a constraint.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaDataProviderConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VaDataProviderConfigs::VaId).uuid().not_null())
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::ProviderType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::Connection)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::Schema)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VaDataProviderConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_va_data_provider_configs_va_id")
                            .from(VaDataProviderConfigs::Table, VaDataProviderConfigs::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_va_data_provider_configs_va_provider_active")
                    .table(VaDataProviderConfigs::Table)
                    .col(VaDataProviderConfigs::VaId)
                    .col(VaDataProviderConfigs::ProviderType)
                    .col(VaDataProviderConfigs::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaDataProviderConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaDataProviderConfigs {
    Table,
    Id,
    VaId,
    ProviderType,
    Connection,
    Schema,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
