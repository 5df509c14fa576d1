//! Pilot repository
//!
//! Natural-key upserts into `airtable_pilots` plus the callsign lookup used by
//! the pilot linker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::UpsertRepository;
use crate::error::RepositoryError;
use crate::models::pilot::{self, Entity as Pilot};

/// Pilot as transformed from a source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotRecord {
    pub va_id: Uuid,
    pub airtable_record_id: String,
    pub callsign: String,
    pub registered: bool,
    pub source_created_at: Option<DateTime<Utc>>,
}

/// Repository for synced pilots
#[derive(Debug, Clone)]
pub struct PilotRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl PilotRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a pilot of a VA by callsign, ignoring case and surrounding
    /// whitespace. Both sides are folded by the database's `LOWER` so the
    /// comparison agrees with the backend's own case rules.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no pilot of that VA carries the callsign
    pub async fn find_by_callsign(
        &self,
        va_id: Uuid,
        callsign: &str,
    ) -> Result<Option<pilot::Model>, RepositoryError> {
        let needle = callsign.trim();
        if needle.is_empty() {
            return Ok(None);
        }
        let found = Pilot::find()
            .filter(pilot::Column::VaId.eq(va_id))
            .filter(
                Expr::expr(Func::lower(Expr::col(pilot::Column::Callsign)))
                    .eq(Func::lower(Expr::val(needle))),
            )
            .order_by_asc(pilot::Column::AirtableRecordId)
            .one(&*self.db)
            .await?;
        Ok(found)
    }

    pub async fn find_by_record_id(
        &self,
        va_id: Uuid,
        airtable_record_id: &str,
    ) -> Result<Option<pilot::Model>, RepositoryError> {
        Ok(Pilot::find()
            .filter(pilot::Column::VaId.eq(va_id))
            .filter(pilot::Column::AirtableRecordId.eq(airtable_record_id))
            .one(&*self.db)
            .await?)
    }

    pub async fn count_for_va(&self, va_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Pilot::find()
            .filter(pilot::Column::VaId.eq(va_id))
            .count(&*self.db)
            .await?)
    }
}

#[async_trait]
impl UpsertRepository<PilotRecord> for PilotRepository {
    async fn upsert(&self, record: &PilotRecord) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let row = pilot::ActiveModel {
            id: Set(Uuid::new_v4()),
            va_id: Set(record.va_id),
            airtable_record_id: Set(record.airtable_record_id.clone()),
            callsign: Set(record.callsign.clone()),
            registered: Set(record.registered),
            source_created_at: Set(record.source_created_at.map(|t| t.fixed_offset())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Pilot::insert(row)
            .on_conflict(
                OnConflict::columns([pilot::Column::VaId, pilot::Column::AirtableRecordId])
                    .update_columns([
                        pilot::Column::Callsign,
                        pilot::Column::Registered,
                        pilot::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }
}
