//! Migration to create the va_user_roles table.
//!
//! Rows are created by member registration. The sync pipeline only ever
//! updates `airtable_pilot_id` once a callsign match is found.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaUserRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VaUserRoles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(VaUserRoles::VaId).uuid().not_null())
                    .col(ColumnDef::new(VaUserRoles::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(VaUserRoles::Role)
                            .text()
                            .not_null()
                            .default("member"),
                    )
                    .col(ColumnDef::new(VaUserRoles::Callsign).text().null())
                    .col(ColumnDef::new(VaUserRoles::AirtablePilotId).text().null())
                    .col(
                        ColumnDef::new(VaUserRoles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VaUserRoles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_va_user_roles_va_id")
                            .from(VaUserRoles::Table, VaUserRoles::VaId)
                            .to(VirtualAirlines::Table, VirtualAirlines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_va_user_roles_va_user")
                    .table(VaUserRoles::Table)
                    .col(VaUserRoles::VaId)
                    .col(VaUserRoles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaUserRoles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaUserRoles {
    Table,
    Id,
    VaId,
    UserId,
    Role,
    Callsign,
    AirtablePilotId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VirtualAirlines {
    Table,
    Id,
}
