//! Virtual airline repository
//!
//! Read-only access to VA rows. Batch jobs iterate [`VirtualAirlineRepository::list_active`].

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::error::RepositoryError;
use crate::models::virtual_airline::{self, Entity as VirtualAirline};

/// Repository for virtual airline lookups
#[derive(Debug, Clone)]
pub struct VirtualAirlineRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl VirtualAirlineRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists active VAs in a stable order
    ///
    /// # Returns
    ///
    /// Every VA with `is_active = true`, ordered by name then id
    pub async fn list_active(&self) -> Result<Vec<virtual_airline::Model>, RepositoryError> {
        let vas = VirtualAirline::find()
            .filter(virtual_airline::Column::IsActive.eq(true))
            .order_by_asc(virtual_airline::Column::Name)
            .order_by_asc(virtual_airline::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list active virtual airlines: {}", e);
                e
            })?;
        Ok(vas)
    }
}
