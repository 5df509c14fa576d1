//! Migration to create the virtual_airlines table.
//!
//! Virtual airlines are the tenants of the service. Rows are soft-deactivated
//! through `is_active` and never hard-deleted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VirtualAirlines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VirtualAirlines::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VirtualAirlines::Name).text().not_null())
                    .col(ColumnDef::new(VirtualAirlines::Code).text().not_null())
                    .col(ColumnDef::new(VirtualAirlines::DiscordServerId).text().null())
                    .col(
                        ColumnDef::new(VirtualAirlines::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VirtualAirlines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VirtualAirlines::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_virtual_airlines_discord_server_id")
                    .table(VirtualAirlines::Table)
                    .col(VirtualAirlines::DiscordServerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VirtualAirlines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
    Name,
    Code,
    DiscordServerId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
