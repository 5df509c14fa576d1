//! SyncHistory entity model
//!
//! This module contains the SeaORM entity model for the va_sync_history table,
//! which records the last successful sync per (VA, event type).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Sync ledger entry
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "va_sync_history")]
pub struct Model {
    /// Unique identifier for the entry (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Virtual airline the sync ran for
    pub va_id: Uuid,

    /// Event type, e.g. "airtable_pilots_sync"
    pub event_type: String,

    /// Completion time of the last successful sync
    pub last_synced_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::virtual_airline::Entity",
        from = "Column::VaId",
        to = "super::virtual_airline::Column::Id"
    )]
    VirtualAirline,
}

impl Related<super::virtual_airline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VirtualAirline.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
