//! Migration to create the airtable_pilots table.
//!
//! Local mirror of the pilot roster kept in each VA's Airtable base. The
//! (va_id, airtable_record_id) unique index is the upsert conflict target.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AirtablePilots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AirtablePilots::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AirtablePilots::VaId).uuid().not_null())
                    .col(
                        ColumnDef::new(AirtablePilots::AirtableRecordId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirtablePilots::Callsign).text().not_null())
                    .col(
                        ColumnDef::new(AirtablePilots::Registered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AirtablePilots::SourceCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AirtablePilots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AirtablePilots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_airtable_pilots_va_id")
                            .from(AirtablePilots::Table, AirtablePilots::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airtable_pilots_va_record")
                    .table(AirtablePilots::Table)
                    .col(AirtablePilots::VaId)
                    .col(AirtablePilots::AirtableRecordId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Callsign lookups are case-insensitive; the linker filters on LOWER(callsign).
        manager
            .create_index(
                Index::create()
                    .name("idx_airtable_pilots_va_callsign")
                    .table(AirtablePilots::Table)
                    .col(AirtablePilots::VaId)
                    .col(AirtablePilots::Callsign)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AirtablePilots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AirtablePilots {
    Table,
    Id,
    VaId,
    AirtableRecordId,
    Callsign,
    Registered,
    SourceCreatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
