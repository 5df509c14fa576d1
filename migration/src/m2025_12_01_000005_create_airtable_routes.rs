//! Migration to create the airtable_routes table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AirtableRoutes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AirtableRoutes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AirtableRoutes::VaId).uuid().not_null())
                    .col(
                        ColumnDef::new(AirtableRoutes::AirtableRecordId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirtableRoutes::Origin).text().null())
                    .col(ColumnDef::new(AirtableRoutes::Destination).text().null())
                    .col(ColumnDef::new(AirtableRoutes::Route).text().not_null())
                    .col(
                        ColumnDef::new(AirtableRoutes::SourceCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AirtableRoutes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AirtableRoutes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_airtable_routes_va_id")
                            .from(AirtableRoutes::Table, AirtableRoutes::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airtable_routes_va_record")
                    .table(AirtableRoutes::Table)
                    .col(AirtableRoutes::VaId)
                    .col(AirtableRoutes::AirtableRecordId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AirtableRoutes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AirtableRoutes {
    Table,
    Id,
    VaId,
    AirtableRecordId,
    Origin,
    Destination,
    Route,
    SourceCreatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
