//! Route entity model for the airtable_routes table.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "airtable_routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub va_id: Uuid,

    pub airtable_record_id: String,

    /// Departure airport (ICAO)
    pub origin: Option<String>,

    /// Arrival airport (ICAO)
    pub destination: Option<String>,

    /// Route identifier, usually the flight number
    pub route: String,

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
