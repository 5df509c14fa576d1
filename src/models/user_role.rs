//! UserRole entity model
//!
//! Rows in va_user_roles are owned by member registration. The sync pipeline
//! only touches `airtable_pilot_id`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "va_user_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub va_id: Uuid,

    /// Local user the role belongs to
    pub user_id: Uuid,

    pub role: String,

    /// Callsign the member registered with
    pub callsign: Option<String>,

    /// Airtable record id of the matched pilot, once linked
    pub airtable_pilot_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
