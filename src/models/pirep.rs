//! Pirep entity model
//!
//! This module contains the SeaORM entity model for the airtable_pireps table
//! (pilot reports of completed flights).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Synced PIREP record
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "airtable_pireps")]
pub struct Model {
    /// Surrogate key (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning virtual airline
    pub va_id: Uuid,

    /// Airtable record id of the PIREP
    pub airtable_record_id: String,

    /// Route flown, as displayed in Airtable
    pub route: Option<String>,

    /// Flight mode (e.g. "Normal", "Event")
    pub flight_mode: Option<String>,

    /// Block time in seconds
    pub flight_time: Option<f64>,

    /// Callsign of the reporting pilot
    pub pilot_callsign: String,

    pub aircraft: Option<String>,

    pub livery: Option<String>,

    /// Airtable record id of the linked route
    pub route_id: Option<String>,

    /// Airtable record id of the linked pilot
    pub pilot_id: Option<String>,

    /// Airtable `createdTime` of the record
    pub source_created_at: Option<DateTimeWithTimeZone>,

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
