//! Data provider configuration repository
//!
//! Only one configuration per (VA, provider type) is meant to be active. This is
//! not a database constraint, so lookups pick the most recently updated active row.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::data_provider_config::{self, Entity as DataProviderConfig, PROVIDER_AIRTABLE};

/// Repository for per-VA provider configurations
#[derive(Debug, Clone)]
pub struct ProviderConfigRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProviderConfigRepository {
    /// Creates a new ProviderConfigRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the active configuration of a provider type for a VA
    ///
    /// # Arguments
    ///
    /// * `va_id` - Virtual airline identifier
    /// * `provider_type` - Provider type string, e.g. `"airtable"`
    ///
    /// # Returns
    ///
    /// The newest active configuration, or `None` when the VA has none
    pub async fn find_active(
        &self,
        va_id: Uuid,
        provider_type: &str,
    ) -> Result<Option<data_provider_config::Model>, RepositoryError> {
        let config = DataProviderConfig::find()
            .filter(data_provider_config::Column::VaId.eq(va_id))
            .filter(data_provider_config::Column::ProviderType.eq(provider_type))
            .filter(data_provider_config::Column::IsActive.eq(true))
            .order_by_desc(data_provider_config::Column::UpdatedAt)
            .order_by_desc(data_provider_config::Column::CreatedAt)
            .one(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!(va_id = %va_id, provider_type, "Failed to load provider config: {}", e);
                e
            })?;
        Ok(config)
    }

    /// Shorthand for the Airtable provider type
    pub async fn find_active_airtable(
        &self,
        va_id: Uuid,
    ) -> Result<Option<data_provider_config::Model>, RepositoryError> {
        self.find_active(va_id, PROVIDER_AIRTABLE).await
    }
}
