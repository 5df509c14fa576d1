//! Pilot entity model
//!
//! This module contains the SeaORM entity model for the airtable_pilots table,
//! the local mirror of each VA's Airtable pilot roster.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Synced pilot record
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "airtable_pilots")]
pub struct Model {
    /// Surrogate key (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning virtual airline; half of the natural key
    pub va_id: Uuid,

    /// Airtable record id (`rec...`); other half of the natural key
    pub airtable_record_id: String,

    /// Pilot callsign as entered in Airtable
    pub callsign: String,

    /// Whether the pilot is marked as registered in Airtable
    pub registered: bool,

    /// Airtable `createdTime` of the record
    pub source_created_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the row was first synced
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the last upsert
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
