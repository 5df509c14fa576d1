//! VirtualAirline entity model
//!
//! This module contains the SeaORM entity model for the virtual_airlines table.
//! Each row is a tenant of the bot; the sync pipeline only reads it.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Virtual airline (tenant) record
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "virtual_airlines")]
pub struct Model {
    /// Unique identifier for the VA (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the VA
    pub name: String,

    /// Short airline code (e.g. "QTR")
    pub code: String,

    /// Discord guild the VA is bound to, if any
    pub discord_server_id: Option<String>,

    /// Inactive VAs are skipped by every batch job
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::data_provider_config::Entity")]
    DataProviderConfig,
}

impl Related<super::data_provider_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DataProviderConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
