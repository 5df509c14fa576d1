//! Migration to create the va_sync_history table.
//!
//! One row per (va_id, event_type) holding the last successful sync time.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaSyncHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VaSyncHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VaSyncHistory::VaId).uuid().not_null())
                    .col(ColumnDef::new(VaSyncHistory::EventType).text().not_null())
                    .col(
                        ColumnDef::new(VaSyncHistory::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VaSyncHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VaSyncHistory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_va_sync_history_va_id")
                            .from(VaSyncHistory::Table, VaSyncHistory::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_va_sync_history_va_event")
                    .table(VaSyncHistory::Table)
                    .col(VaSyncHistory::VaId)
                    .col(VaSyncHistory::EventType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaSyncHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaSyncHistory {
    Table,
    Id,
    VaId,
    EventType,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
