//! Route network sync

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::{EntitySync, RecordSink, SyncJob, UpsertSink};
use crate::connectors::SourceRecord;
use crate::error::RecordError;
use crate::repositories::{RouteRecord, RouteRepository};
use crate::schema::{EntityKind, EntitySchema, FieldReader};

pub const FIELD_ROUTE: &str = "route";
pub const FIELD_ORIGIN: &str = "origin";
pub const FIELD_DESTINATION: &str = "destination";

pub struct Routes;

impl EntitySync for Routes {
    type Record = RouteRecord;

    const KIND: EntityKind = EntityKind::Route;

    fn transform(
        va_id: Uuid,
        record: &SourceRecord,
        schema: &EntitySchema,
    ) -> Result<RouteRecord, RecordError> {
        let fields = FieldReader::new(schema, &record.fields);
        Ok(RouteRecord {
            va_id,
            airtable_record_id: record.id.clone(),
            origin: fields.optional_string(FIELD_ORIGIN)?,
            destination: fields.optional_string(FIELD_DESTINATION)?,
            route: fields.required_string(FIELD_ROUTE)?,
            source_created_at: record.created_time,
        })
    }

    fn upsert_sink(db: Arc<DatabaseConnection>) -> Arc<dyn RecordSink<RouteRecord>> {
        Arc::new(UpsertSink::new(RouteRepository::new(db)))
    }
}

pub type RouteSyncJob = SyncJob<Routes>;
