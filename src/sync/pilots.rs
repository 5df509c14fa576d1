//! Pilot roster sync

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::{EntitySync, RecordSink, SyncJob, UpsertSink};
use crate::connectors::SourceRecord;
use crate::error::RecordError;
use crate::repositories::{PilotRecord, PilotRepository};
use crate::schema::{EntityKind, EntitySchema, FieldReader};

pub const FIELD_CALLSIGN: &str = "callsign";
pub const FIELD_REGISTERED: &str = "registered";

pub struct Pilots;

impl EntitySync for Pilots {
    type Record = PilotRecord;

    const KIND: EntityKind = EntityKind::Pilot;

    fn transform(
        va_id: Uuid,
        record: &SourceRecord,
        schema: &EntitySchema,
    ) -> Result<PilotRecord, RecordError> {
        let fields = FieldReader::new(schema, &record.fields);
        Ok(PilotRecord {
            va_id,
            airtable_record_id: record.id.clone(),
            callsign: fields.required_string(FIELD_CALLSIGN)?,
            // Airtable omits unchecked checkboxes entirely.
            registered: fields.optional_bool(FIELD_REGISTERED)?.unwrap_or(false),
            source_created_at: record.created_time,
        })
    }

    fn upsert_sink(db: Arc<DatabaseConnection>) -> Arc<dyn RecordSink<PilotRecord>> {
        Arc::new(UpsertSink::new(PilotRepository::new(db)))
    }
}

pub type PilotSyncJob = SyncJob<Pilots>;
