//! PIREP repository
//!
//! Shared by the synchronous upsert sink and the stream consumer, so both
//! paths apply the same natural-key contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::UpsertRepository;
use crate::error::RepositoryError;
use crate::models::pirep::{self, Entity as Pirep};

/// PIREP as transformed from a source record. Also the payload format of the
/// PIREP stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirepRecord {
    pub va_id: Uuid,
    pub airtable_record_id: String,
    pub route: Option<String>,
    pub flight_mode: Option<String>,
    /// Seconds
    pub flight_time: Option<f64>,
    pub pilot_callsign: String,
    pub aircraft: Option<String>,
    pub livery: Option<String>,
    pub route_id: Option<String>,
    pub pilot_id: Option<String>,
    pub source_created_at: Option<DateTime<Utc>>,
}

/// Repository for synced PIREPs
#[derive(Debug, Clone)]
pub struct PirepRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl PirepRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_record_id(
        &self,
        va_id: Uuid,
        airtable_record_id: &str,
    ) -> Result<Option<pirep::Model>, RepositoryError> {
        Ok(Pirep::find()
            .filter(pirep::Column::VaId.eq(va_id))
            .filter(pirep::Column::AirtableRecordId.eq(airtable_record_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn count_for_va(&self, va_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Pirep::find()
            .filter(pirep::Column::VaId.eq(va_id))
            .count(&*self.db)
            .await?)
    }
}

#[async_trait]
impl UpsertRepository<PirepRecord> for PirepRepository {
    async fn upsert(&self, record: &PirepRecord) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let row = pirep::ActiveModel {
            id: Set(Uuid::new_v4()),
            va_id: Set(record.va_id),
            airtable_record_id: Set(record.airtable_record_id.clone()),
            route: Set(record.route.clone()),
            flight_mode: Set(record.flight_mode.clone()),
            flight_time: Set(record.flight_time),
            pilot_callsign: Set(record.pilot_callsign.clone()),
            aircraft: Set(record.aircraft.clone()),
            livery: Set(record.livery.clone()),
            route_id: Set(record.route_id.clone()),
            pilot_id: Set(record.pilot_id.clone()),
            source_created_at: Set(record.source_created_at.map(|t| t.fixed_offset())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Pirep::insert(row)
            .on_conflict(
                OnConflict::columns([pirep::Column::VaId, pirep::Column::AirtableRecordId])
                    .update_columns([
                        pirep::Column::Route,
                        pirep::Column::FlightMode,
                        pirep::Column::FlightTime,
                        pirep::Column::PilotCallsign,
                        pirep::Column::Aircraft,
                        pirep::Column::Livery,
                        pirep::Column::RouteId,
                        pirep::Column::PilotId,
                        pirep::Column::SourceCreatedAt,
                        pirep::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!(
                    va_id = %record.va_id,
                    record_id = %record.airtable_record_id,
                    "Failed to upsert PIREP: {}",
                    e
                );
                e
            })?;
        Ok(())
    }
}
