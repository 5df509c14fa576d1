//! Test utilities for database-backed tests.
//!
//! Sets up in-memory SQLite databases with migrations applied, inserts
//! fixture rows, and provides a scripted [`RecordSourceFactory`] standing in
//! for Airtable.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use uuid::Uuid;

use va_sync::connectors::{
    Cursor, FetchFilters, RecordPage, RecordSource, RecordSourceFactory, SourceError, SourceRecord,
};
use va_sync::models::{data_provider_config, user_role, virtual_airline};
use va_sync::schema::{AirtableConnection, EntitySchema};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Inserts an active virtual airline and returns its id.
pub async fn create_va(db: &DatabaseConnection, code: &str) -> Result<Uuid> {
    create_va_with_status(db, code, true).await
}

pub async fn create_va_with_status(
    db: &DatabaseConnection,
    code: &str,
    is_active: bool,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    virtual_airline::ActiveModel {
        id: Set(id),
        name: Set(format!("{code} Virtual")),
        code: Set(code.to_string()),
        discord_server_id: Set(None),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// Inserts an active Airtable configuration for a VA.
pub async fn insert_airtable_config(
    db: &DatabaseConnection,
    va_id: Uuid,
    schema: Value,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    data_provider_config::ActiveModel {
        id: Set(id),
        va_id: Set(va_id),
        provider_type: Set(data_provider_config::PROVIDER_AIRTABLE.to_string()),
        connection: Set(json!({ "base_id": format!("app{}", va_id.simple()), "api_key": "key" })),
        schema: Set(schema),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// Inserts a user role with an optional callsign and no pilot link.
pub async fn insert_user_role(
    db: &DatabaseConnection,
    va_id: Uuid,
    callsign: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    user_role::ActiveModel {
        id: Set(id),
        va_id: Set(va_id),
        user_id: Set(Uuid::new_v4()),
        role: Set("pilot".to_string()),
        callsign: Set(callsign.map(str::to_string)),
        airtable_pilot_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// Schema document with a single entity entry.
pub fn schema_document(
    entity: &str,
    table: &str,
    mappings: &[(&str, &str)],
    last_modified: Option<&str>,
) -> Value {
    let field_mappings: serde_json::Map<String, Value> = mappings
        .iter()
        .map(|(logical, column)| (logical.to_string(), Value::String(column.to_string())))
        .collect();
    json!({
        "entities": {
            entity: {
                "table_name": table,
                "field_mappings": field_mappings,
                "last_modified_field": last_modified,
            }
        }
    })
}

pub fn pilot_schema(last_modified: Option<&str>) -> Value {
    schema_document(
        "pilot",
        "Pilots",
        &[("callsign", "Callsign"), ("registered", "Registered")],
        last_modified,
    )
}

pub fn source_record(id: &str, fields: Value) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        created_time: Some(Utc::now()),
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}

/// Record whose last-modified column holds `modified_at`.
pub fn modified_record(
    id: &str,
    mut fields: Value,
    column: &str,
    modified_at: DateTime<Utc>,
) -> SourceRecord {
    fields[column] = Value::String(modified_at.to_rfc3339());
    SourceRecord {
        id: id.to_string(),
        created_time: Some(modified_at),
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}

/// A page request as the scripted source saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub base_id: String,
    pub filters: FetchFilters,
    pub at: DateTime<Utc>,
}

/// Scripted record source keyed by Airtable base id.
///
/// Every page request is recorded so tests can assert on the filters a
/// sync job sent. Incremental requests behave like Airtable's formula: a
/// record is returned only when its last-modified column (or, without one,
/// its created time) is at or after `modified_since`.
#[derive(Default)]
pub struct ScriptedSources {
    pages: Mutex<HashMap<String, Vec<Vec<SourceRecord>>>>,
    failing: Mutex<HashMap<String, SourceError>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ScriptedSources {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Base id used by [`insert_airtable_config`] for a VA.
    pub fn base_for(va_id: Uuid) -> String {
        format!("app{}", va_id.simple())
    }

    pub fn set_pages(&self, va_id: Uuid, pages: Vec<Vec<SourceRecord>>) {
        self.pages
            .lock()
            .unwrap()
            .insert(Self::base_for(va_id), pages);
    }

    pub fn fail_for(&self, va_id: Uuid, error: SourceError) {
        self.failing
            .lock()
            .unwrap()
            .insert(Self::base_for(va_id), error);
    }

    pub fn requests_for(&self, va_id: Uuid) -> Vec<FetchFilters> {
        self.seen_for(va_id).into_iter().map(|r| r.filters).collect()
    }

    pub fn seen_for(&self, va_id: Uuid) -> Vec<SeenRequest> {
        let base = Self::base_for(va_id);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.base_id == base)
            .cloned()
            .collect()
    }
}

struct ScriptedSource {
    base_id: String,
    pages: Vec<Vec<SourceRecord>>,
    failure: Option<SourceError>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

fn modified_at(record: &SourceRecord, column: Option<&str>) -> Option<DateTime<Utc>> {
    column
        .and_then(|c| record.fields.get(c))
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
        .or(record.created_time)
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_page(
        &self,
        schema: &EntitySchema,
        filters: &FetchFilters,
    ) -> Result<RecordPage, SourceError> {
        self.requests.lock().unwrap().push(SeenRequest {
            base_id: self.base_id.clone(),
            filters: filters.clone(),
            at: Utc::now(),
        });
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let index: usize = filters
            .cursor
            .as_ref()
            .and_then(Cursor::as_str)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let column = schema.last_modified_field();
        let records = self
            .pages
            .get(index)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|record| match filters.modified_since {
                Some(since) => modified_at(record, column).is_some_and(|t| t >= since),
                None => true,
            })
            .collect();
        let has_more = index + 1 < self.pages.len();
        Ok(RecordPage {
            records,
            next_cursor: has_more.then(|| Cursor::from_string((index + 1).to_string())),
            has_more,
        })
    }
}

impl RecordSourceFactory for ScriptedSources {
    fn connect(
        &self,
        _va_id: Uuid,
        connection: &AirtableConnection,
    ) -> Result<Arc<dyn RecordSource>, SourceError> {
        let base_id = connection.base_id.clone();
        Ok(Arc::new(ScriptedSource {
            pages: self
                .pages
                .lock()
                .unwrap()
                .get(&base_id)
                .cloned()
                .unwrap_or_default(),
            failure: self.failing.lock().unwrap().get(&base_id).cloned(),
            requests: self.requests.clone(),
            base_id,
        }))
    }
}
