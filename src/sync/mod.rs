//! # Sync Jobs
//!
//! Orchestrates Airtable → Postgres synchronization for one entity kind at a
//! time. A run for a single VA goes through these steps:
//!
//! 1. Load the VA's active Airtable configuration. None means the VA is skipped.
//! 2. Resolve the entity schema. Absent or disabled means the VA is skipped.
//! 3. Pick the sync mode. Incremental needs both a ledger entry for the VA and a
//!    last-modified column in the schema; anything else is a full sync.
//! 4. Fetch pages until the source reports no more. Each record is transformed
//!    and handed to the job's [`RecordSink`]. A bad record is counted and skipped.
//! 5. Record the sync in the ledger, stamped with the time the run started so
//!    edits made while pages were being read fall inside the next window. A
//!    page fetch error aborts before this step.
//!
//! [`SyncJob::run_all`] walks every active VA and isolates failures;
//! [`SyncJob::run_for_va`] is the single-tenant entry point used for manual
//! triggers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::connectors::{FetchFilters, RecordSourceFactory, SourceRecord};
use crate::error::{RecordError, RepositoryError, SyncError};
use crate::repositories::{
    ProviderConfigRepository, SyncHistoryRepository, VirtualAirlineRepository,
};
use crate::schema::{AirtableConnection, EntityKind, EntitySchema, SchemaDocument};

pub mod consumer;
pub mod linker;
pub mod pilots;
pub mod pireps;
pub mod routes;
pub mod sink;

pub use consumer::PirepStreamConsumer;
pub use linker::{LinkReport, PilotLinker};
pub use pilots::{PilotSyncJob, Pilots};
pub use pireps::{PirepSyncJob, Pireps};
pub use routes::{RouteSyncJob, Routes};
pub use sink::{RecordSink, StreamSink, UpsertSink};

/// Default records per page requested from the source
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// How a run selects records from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every record of the table
    Full,
    /// Records whose last-modified field is at or after `since`
    Incremental { since: DateTime<Utc> },
}

impl SyncMode {
    /// Decide between incremental and full sync.
    ///
    /// A schema without a last-modified column always gets a full sync: a
    /// timestamp filter on a column that does not exist would match nothing.
    pub fn determine(last_sync: Option<DateTime<Utc>>, schema: &EntitySchema) -> Self {
        match (last_sync, schema.last_modified_field()) {
            (Some(since), Some(_)) => SyncMode::Incremental { since },
            _ => SyncMode::Full,
        }
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            SyncMode::Full => None,
            SyncMode::Incremental { since } => Some(*since),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Incremental { .. } => "incremental",
        }
    }
}

/// Why a VA's run ended before fetching anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoConfiguration,
    SchemaMissing,
    SchemaDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoConfiguration => "no active airtable configuration",
            SkipReason::SchemaMissing => "entity schema not configured",
            SkipReason::SchemaDisabled => "entity schema disabled",
        })
    }
}

/// Counters for one completed VA run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub pages: u32,
    pub fetched: u64,
    pub synced: u64,
    pub failed: u64,
    /// False when the ledger write failed after the records were committed
    pub ledger_recorded: bool,
}

impl SyncReport {
    fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            pages: 0,
            fetched: 0,
            synced: 0,
            failed: 0,
            ledger_recorded: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Completed(SyncReport),
}

impl SyncOutcome {
    /// Records handed to the sink successfully
    pub fn synced(&self) -> u64 {
        match self {
            SyncOutcome::Skipped(_) => 0,
            SyncOutcome::Completed(report) => report.synced,
        }
    }
}

/// Entity-specific half of a sync job: which schema entry to use and how a
/// source record becomes a local record.
pub trait EntitySync: Send + Sync + 'static {
    type Record: Serialize + DeserializeOwned + Send + Sync + 'static;

    const KIND: EntityKind;

    fn transform(
        va_id: Uuid,
        record: &SourceRecord,
        schema: &EntitySchema,
    ) -> Result<Self::Record, RecordError>;

    /// Sink that upserts records directly into the entity's table
    fn upsert_sink(db: Arc<DatabaseConnection>) -> Arc<dyn RecordSink<Self::Record>>;
}

/// Sync job for one entity kind
pub struct SyncJob<E: EntitySync> {
    sources: Arc<dyn RecordSourceFactory>,
    sink: Arc<dyn RecordSink<E::Record>>,
    configs: ProviderConfigRepository,
    history: SyncHistoryRepository,
    vas: VirtualAirlineRepository,
    page_size: u32,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntitySync> SyncJob<E> {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sources: Arc<dyn RecordSourceFactory>,
        sink: Arc<dyn RecordSink<E::Record>>,
    ) -> Self {
        Self {
            sources,
            sink,
            configs: ProviderConfigRepository::new(db.clone()),
            history: SyncHistoryRepository::new(db.clone()),
            vas: VirtualAirlineRepository::new(db),
            page_size: DEFAULT_PAGE_SIZE,
            _entity: PhantomData,
        }
    }

    /// Job writing straight into the local table
    pub fn with_upsert(db: Arc<DatabaseConnection>, sources: Arc<dyn RecordSourceFactory>) -> Self {
        let sink = E::upsert_sink(db.clone());
        Self::new(db, sources, sink)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    /// Sync every active VA, one after another.
    ///
    /// A failing VA is logged and does not stop the others.
    ///
    /// # Returns
    ///
    /// Total records synced across all VAs. Zero does not distinguish "no VA
    /// configured" from "every VA failed"; see the logs for that.
    #[instrument(skip(self), fields(entity = %E::KIND, sink = self.sink.name()))]
    pub async fn run_all(&self) -> u64 {
        let vas = match self.vas.list_active().await {
            Ok(vas) => vas,
            Err(err) => {
                error!(error = ?err, "Failed to list virtual airlines");
                return 0;
            }
        };

        let mut total = 0;
        let mut failed_vas = 0;
        for va in &vas {
            match self.run_for_va(va.id).await {
                Ok(outcome) => total += outcome.synced(),
                Err(err) => {
                    failed_vas += 1;
                    error!(
                        error = %err,
                        transient = err.is_transient(),
                        va_id = %va.id,
                        va_code = %va.code,
                        "Sync failed for virtual airline"
                    );
                }
            }
        }

        info!(
            vas = vas.len(),
            failed_vas,
            synced = total,
            "Sync run completed"
        );
        total
    }

    /// Sync a single VA.
    ///
    /// # Returns
    ///
    /// The outcome of the run, or the error that aborted it. The ledger is only
    /// advanced when every page was fetched.
    #[instrument(skip(self), fields(entity = %E::KIND, va_id = %va_id))]
    pub async fn run_for_va(&self, va_id: Uuid) -> Result<SyncOutcome, SyncError> {
        let started = Instant::now();
        let result = self.sync_va(va_id).await;

        let outcome_label = match &result {
            Ok(SyncOutcome::Completed(_)) => "completed",
            Ok(SyncOutcome::Skipped(_)) => "skipped",
            Err(_) => "failed",
        };
        let labels = vec![
            ("entity", E::KIND.as_str().to_string()),
            ("outcome", outcome_label.to_string()),
        ];
        counter!("va_sync_runs_total", &labels).increment(1);
        histogram!("va_sync_run_duration_ms", &labels)
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        result
    }

    async fn sync_va(&self, va_id: Uuid) -> Result<SyncOutcome, SyncError> {
        let Some(config) = self.configs.find_active_airtable(va_id).await? else {
            info!("No active Airtable configuration, nothing to do");
            return Ok(SyncOutcome::Skipped(SkipReason::NoConfiguration));
        };

        let document =
            SchemaDocument::from_json(&config.schema).map_err(|e| RepositoryError::InvalidDocument {
                va_id,
                what: "schema",
                details: e.to_string(),
            })?;
        let Some(schema) = document.entity(E::KIND) else {
            info!("Entity schema not configured, nothing to do");
            return Ok(SyncOutcome::Skipped(SkipReason::SchemaMissing));
        };
        if !schema.enabled {
            info!("Entity schema disabled, nothing to do");
            return Ok(SyncOutcome::Skipped(SkipReason::SchemaDisabled));
        }

        let last_sync = self
            .history
            .get_last_sync_time(va_id, E::KIND.event_type())
            .await?;
        let mode = SyncMode::determine(last_sync, schema);

        let connection = AirtableConnection::from_json(&config.connection).map_err(|e| {
            RepositoryError::InvalidDocument {
                va_id,
                what: "connection",
                details: e.to_string(),
            }
        })?;
        let source = self.sources.connect(va_id, &connection)?;

        info!(
            mode = mode.as_str(),
            since = ?mode.since(),
            table = %schema.table_name,
            "Starting sync"
        );

        let run_started = Utc::now();
        let mut report = SyncReport::new(mode);
        let mut filters = FetchFilters::first_page(self.page_size, mode.since());
        loop {
            let page = source.fetch_page(schema, &filters).await?;
            report.pages += 1;
            report.fetched += page.records.len() as u64;

            let mut page_synced = 0u64;
            let mut page_failed = 0u64;
            for record in &page.records {
                let local = match E::transform(va_id, record, schema) {
                    Ok(local) => local,
                    Err(err) => {
                        page_failed += 1;
                        warn!(record_id = %record.id, error = %err, "Skipping record");
                        continue;
                    }
                };
                match self.sink.accept(local).await {
                    Ok(()) => page_synced += 1,
                    Err(err) => {
                        page_failed += 1;
                        error!(record_id = %record.id, error = %err, "Failed to persist record");
                    }
                }
            }
            report.synced += page_synced;
            report.failed += page_failed;

            info!(
                page = report.pages,
                page_records = page.records.len(),
                page_synced,
                page_failed,
                total_synced = report.synced,
                total_failed = report.failed,
                "Processed page"
            );

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(cursor) => filters.cursor = Some(cursor),
                None => {
                    warn!("Source reported more pages without a cursor, stopping");
                    break;
                }
            }
        }

        let labels = vec![("entity", E::KIND.as_str().to_string())];
        counter!("va_sync_records_total", &labels).increment(report.synced);
        if report.failed > 0 {
            let labels = vec![
                ("entity", E::KIND.as_str().to_string()),
                ("outcome", "failed".to_string()),
            ];
            counter!("va_sync_record_failures_total", &labels).increment(report.failed);
        }

        // Committed records stay committed even if the ledger write fails.
        match self
            .history
            .record_sync_at(va_id, E::KIND.event_type(), run_started)
            .await
        {
            Ok(()) => report.ledger_recorded = true,
            Err(err) => {
                error!(error = %err, "Failed to record sync history");
            }
        }

        debug!(?report, "Sync finished");
        info!(
            mode = mode.as_str(),
            pages = report.pages,
            fetched = report.fetched,
            synced = report.synced,
            failed = report.failed,
            "Sync completed"
        );
        Ok(SyncOutcome::Completed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schema(last_modified: Option<&str>) -> EntitySchema {
        EntitySchema {
            table_name: "Pilots".to_string(),
            enabled: true,
            field_mappings: Default::default(),
            last_modified_field: last_modified.map(str::to_string),
        }
    }

    #[test]
    fn incremental_requires_history_and_last_modified_field() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        assert_eq!(
            SyncMode::determine(Some(t), &schema(Some("Modified"))),
            SyncMode::Incremental { since: t }
        );
        assert_eq!(SyncMode::determine(Some(t), &schema(None)), SyncMode::Full);
        assert_eq!(
            SyncMode::determine(None, &schema(Some("Modified"))),
            SyncMode::Full
        );
        assert_eq!(SyncMode::determine(Some(t), &schema(Some(""))), SyncMode::Full);
    }

    #[test]
    fn skipped_outcome_counts_zero() {
        assert_eq!(SyncOutcome::Skipped(SkipReason::SchemaDisabled).synced(), 0);
        let mut report = SyncReport::new(SyncMode::Full);
        report.synced = 7;
        assert_eq!(SyncOutcome::Completed(report).synced(), 7);
    }
}
