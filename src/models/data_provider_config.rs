//! DataProviderConfig entity model
//!
//! This module contains the SeaORM entity model for the va_data_provider_configs
//! table. A row carries the connection parameters and the entity schema document
//! for one external data provider of one VA.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Provider type string stored for Airtable-backed configurations
pub const PROVIDER_AIRTABLE: &str = "airtable";

/// Per-VA data provider configuration
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "va_data_provider_configs")]
pub struct Model {
    /// Unique identifier for the configuration (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning virtual airline
    pub va_id: Uuid,

    /// Provider type, e.g. "airtable"
    pub provider_type: String,

    /// Connection parameters (base id, optional API key override)
    #[sea_orm(column_type = "JsonBinary")]
    pub connection: JsonValue,

    /// Entity schema document mapping logical fields to source columns
    #[sea_orm(column_type = "JsonBinary")]
    pub schema: JsonValue,

    /// Only active rows are considered; the newest active row wins
    pub is_active: bool,

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
