//! Migration to create the airtable_pireps table.
//!
//! `route_id` and `pilot_id` hold Airtable record ids of the linked route and
//! pilot records, not local surrogate keys.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AirtablePireps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AirtablePireps::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AirtablePireps::VaId).uuid().not_null())
                    .col(
                        ColumnDef::new(AirtablePireps::AirtableRecordId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirtablePireps::Route).text().null())
                    .col(ColumnDef::new(AirtablePireps::FlightMode).text().null())
                    .col(ColumnDef::new(AirtablePireps::FlightTime).double().null())
                    .col(
                        ColumnDef::new(AirtablePireps::PilotCallsign)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirtablePireps::Aircraft).text().null())
                    .col(ColumnDef::new(AirtablePireps::Livery).text().null())
                    .col(ColumnDef::new(AirtablePireps::RouteId).text().null())
                    .col(ColumnDef::new(AirtablePireps::PilotId).text().null())
                    .col(
                        ColumnDef::new(AirtablePireps::SourceCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AirtablePireps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AirtablePireps::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_airtable_pireps_va_id")
                            .from(AirtablePireps::Table, AirtablePireps::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airtable_pireps_va_record")
                    .table(AirtablePireps::Table)
                    .col(AirtablePireps::VaId)
                    .col(AirtablePireps::AirtableRecordId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airtable_pireps_va_pilot_callsign")
                    .table(AirtablePireps::Table)
                    .col(AirtablePireps::VaId)
                    .col(AirtablePireps::PilotCallsign)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AirtablePireps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AirtablePireps {
    Table,
    Id,
    VaId,
    AirtableRecordId,
    Route,
    FlightMode,
    FlightTime,
    PilotCallsign,
    Aircraft,
    Livery,
    RouteId,
    PilotId,
    SourceCreatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
