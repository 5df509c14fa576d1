//! PIREP sync
//!
//! With the queue enabled, PIREPs go through a [`super::StreamSink`] and are
//! applied by [`super::PirepStreamConsumer`]; otherwise they are upserted inline.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::{EntitySync, RecordSink, SyncJob, UpsertSink};
use crate::connectors::SourceRecord;
use crate::error::RecordError;
use crate::repositories::{PirepRecord, PirepRepository};
use crate::schema::{EntityKind, EntitySchema, FieldReader};

pub const FIELD_PILOT_CALLSIGN: &str = "pilot_callsign";
pub const FIELD_ROUTE: &str = "route";
pub const FIELD_FLIGHT_MODE: &str = "flight_mode";
pub const FIELD_FLIGHT_TIME: &str = "flight_time";
pub const FIELD_AIRCRAFT: &str = "aircraft";
pub const FIELD_LIVERY: &str = "livery";
pub const FIELD_ROUTE_ID: &str = "route_id";
pub const FIELD_PILOT_ID: &str = "pilot_id";

pub struct Pireps;

impl EntitySync for Pireps {
    type Record = PirepRecord;

    const KIND: EntityKind = EntityKind::Pirep;

    fn transform(
        va_id: Uuid,
        record: &SourceRecord,
        schema: &EntitySchema,
    ) -> Result<PirepRecord, RecordError> {
        let fields = FieldReader::new(schema, &record.fields);
        Ok(PirepRecord {
            va_id,
            airtable_record_id: record.id.clone(),
            route: fields.optional_string(FIELD_ROUTE)?,
            flight_mode: fields.optional_string(FIELD_FLIGHT_MODE)?,
            flight_time: fields.optional_number(FIELD_FLIGHT_TIME)?,
            pilot_callsign: fields.required_string(FIELD_PILOT_CALLSIGN)?,
            aircraft: fields.optional_string(FIELD_AIRCRAFT)?,
            livery: fields.optional_string(FIELD_LIVERY)?,
            route_id: fields.optional_string(FIELD_ROUTE_ID)?,
            pilot_id: fields.optional_string(FIELD_PILOT_ID)?,
            source_created_at: record.created_time,
        })
    }

    fn upsert_sink(db: Arc<DatabaseConnection>) -> Arc<dyn RecordSink<PirepRecord>> {
        Arc::new(UpsertSink::new(PirepRepository::new(db)))
    }
}

pub type PirepSyncJob = SyncJob<Pireps>;
