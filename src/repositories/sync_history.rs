//! Sync history ledger
//!
//! One row per (VA, event type) holding the checkpoint of the last successful
//! sync. The orchestrator stores the time that run started, which is the lower
//! bound of the next incremental window. Writes are upserts on that pair, so concurrent jobs for
//! different VAs never contend on the same row.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::sync_history::{self, Entity as SyncHistory};

/// Repository for the sync ledger
#[derive(Debug, Clone)]
pub struct SyncHistoryRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SyncHistoryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records a successful sync completed now
    pub async fn record_sync(&self, va_id: Uuid, event_type: &str) -> Result<(), RepositoryError> {
        self.record_sync_at(va_id, event_type, Utc::now()).await
    }

    /// Records a successful sync with checkpoint `at`
    ///
    /// # Arguments
    ///
    /// * `va_id` - Virtual airline identifier
    /// * `event_type` - Ledger event type, e.g. `"airtable_pilots_sync"`
    /// * `at` - Checkpoint to store; the next incremental run fetches records
    ///   modified at or after it
    pub async fn record_sync_at(
        &self,
        va_id: Uuid,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let at = at.fixed_offset();
        let entry = sync_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            va_id: Set(va_id),
            event_type: Set(event_type.to_string()),
            last_synced_at: Set(at),
            created_at: Set(at),
            updated_at: Set(at),
        };

        SyncHistory::insert(entry)
            .on_conflict(
                OnConflict::columns([
                    sync_history::Column::VaId,
                    sync_history::Column::EventType,
                ])
                .update_columns([
                    sync_history::Column::LastSyncedAt,
                    sync_history::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(|e| {
                tracing::error!(va_id = %va_id, event_type, "Failed to record sync: {}", e);
                e
            })?;
        Ok(())
    }

    /// Last successful sync of `event_type` for one VA
    pub async fn get_last_sync_time(
        &self,
        va_id: Uuid,
        event_type: &str,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let entry = SyncHistory::find()
            .filter(sync_history::Column::VaId.eq(va_id))
            .filter(sync_history::Column::EventType.eq(event_type))
            .one(&*self.db)
            .await?;
        Ok(entry.map(|e| e.last_synced_at.with_timezone(&Utc)))
    }

    /// Most recent sync of `event_type` across all VAs
    ///
    /// Only meant for the process-wide startup heuristic. Per-VA decisions must
    /// use [`SyncHistoryRepository::get_last_sync_time`].
    pub async fn get_last_sync_time_for_event(
        &self,
        event_type: &str,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let entry = SyncHistory::find()
            .filter(sync_history::Column::EventType.eq(event_type))
            .order_by_desc(sync_history::Column::LastSyncedAt)
            .one(&*self.db)
            .await?;
        Ok(entry.map(|e| e.last_synced_at.with_timezone(&Utc)))
    }
}
