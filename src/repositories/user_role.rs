//! User role repository
//!
//! The sync pipeline never creates user roles; it only fills in the pilot link.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::user_role::{self, Entity as UserRole};

#[derive(Debug, Clone)]
pub struct UserRoleRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UserRoleRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Roles of a VA that carry a callsign but no pilot link yet
    pub async fn list_unlinked_with_callsign(
        &self,
        va_id: Uuid,
    ) -> Result<Vec<user_role::Model>, RepositoryError> {
        let roles = UserRole::find()
            .filter(user_role::Column::VaId.eq(va_id))
            .filter(user_role::Column::Callsign.is_not_null())
            .filter(user_role::Column::Callsign.ne(""))
            .filter(
                Condition::any()
                    .add(user_role::Column::AirtablePilotId.is_null())
                    .add(user_role::Column::AirtablePilotId.eq("")),
            )
            .order_by_asc(user_role::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(roles)
    }

    /// Sets the pilot link of a role
    ///
    /// # Returns
    ///
    /// `Ok(true)` when the row changed, `Ok(false)` when it already pointed at
    /// `pilot_record_id` or no longer exists
    pub async fn set_pilot_link(
        &self,
        role_id: Uuid,
        pilot_record_id: &str,
    ) -> Result<bool, RepositoryError> {
        let Some(role) = UserRole::find_by_id(role_id).one(&*self.db).await? else {
            tracing::warn!(role_id = %role_id, "User role disappeared before linking");
            return Ok(false);
        };
        if role.airtable_pilot_id.as_deref() == Some(pilot_record_id) {
            return Ok(false);
        }

        let mut active: user_role::ActiveModel = role.into();
        active.airtable_pilot_id = Set(Some(pilot_record_id.to_string()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&*self.db).await.map_err(|e| {
            tracing::error!(role_id = %role_id, "Failed to link user role to pilot: {}", e);
            e
        })?;
        Ok(true)
    }
}
