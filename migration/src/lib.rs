//! Database migrations for the VA sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_12_01_000001_create_virtual_airlines;
mod m2025_12_01_000002_create_va_data_provider_configs;
mod m2025_12_01_000003_create_va_user_roles;
mod m2025_12_01_000004_create_airtable_pilots;
mod m2025_12_01_000005_create_airtable_routes;
mod m2025_12_01_000006_create_airtable_pireps;
mod m2025_12_01_000007_create_va_sync_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_12_01_000001_create_virtual_airlines::Migration),
            Box::new(m2025_12_01_000002_create_va_data_provider_configs::Migration),
            Box::new(m2025_12_01_000003_create_va_user_roles::Migration),
            Box::new(m2025_12_01_000004_create_airtable_pilots::Migration),
            Box::new(m2025_12_01_000005_create_airtable_routes::Migration),
            Box::new(m2025_12_01_000006_create_airtable_pireps::Migration),
            Box::new(m2025_12_01_000007_create_va_sync_history::Migration),
        ]
    }
}
