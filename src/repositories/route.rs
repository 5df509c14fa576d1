//! Route repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::UpsertRepository;
use crate::error::RepositoryError;
use crate::models::route::{self, Entity as Route};

/// Route as transformed from a source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub va_id: Uuid,
    pub airtable_record_id: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub route: String,
    pub source_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RouteRepository {
    pub db: Arc<DatabaseConnection>,
}

impl RouteRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_record_id(
        &self,
        va_id: Uuid,
        airtable_record_id: &str,
    ) -> Result<Option<route::Model>, RepositoryError> {
        Ok(Route::find()
            .filter(route::Column::VaId.eq(va_id))
            .filter(route::Column::AirtableRecordId.eq(airtable_record_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn count_for_va(&self, va_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Route::find()
            .filter(route::Column::VaId.eq(va_id))
            .count(&*self.db)
            .await?)
    }
}

#[async_trait]
impl UpsertRepository<RouteRecord> for RouteRepository {
    async fn upsert(&self, record: &RouteRecord) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let row = route::ActiveModel {
            id: Set(Uuid::new_v4()),
            va_id: Set(record.va_id),
            airtable_record_id: Set(record.airtable_record_id.clone()),
            origin: Set(record.origin.clone()),
            destination: Set(record.destination.clone()),
            route: Set(record.route.clone()),
            source_created_at: Set(record.source_created_at.map(|t| t.fixed_offset())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Route::insert(row)
            .on_conflict(
                OnConflict::columns([route::Column::VaId, route::Column::AirtableRecordId])
                    .update_columns([
                        route::Column::Origin,
                        route::Column::Destination,
                        route::Column::Route,
                        route::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }
}
