//! Record source trait definition
//!
//! Defines the interface every external tabular data source implements: fetch
//! one page of records at a time, driven by an opaque continuation cursor.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::schema::{AirtableConnection, EntitySchema};

/// Errors surfaced by a record source. The source never retries; the caller
/// decides what a failure means for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// HTTP error from the upstream store
    #[error("HTTP error {status}: {}", .body.as_deref().unwrap_or("No body"))]
    Http { status: u16, body: Option<String> },

    /// Response body could not be decoded
    #[error("Malformed response: {details}")]
    MalformedResponse { details: String },

    /// Network or connectivity error
    #[error("Network error: {details}")]
    Network { details: String, retryable: bool },

    /// Credentials rejected (401/403)
    #[error("Authentication error ({status}): {details}")]
    Authentication { status: u16, details: String },

    /// Rate limited, with the server's retry hint when present
    #[error("Rate limit exceeded{}", .retry_after.map(|s| format!(" (retry after: {s}s)")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    /// Missing base id, API key or other setup problem
    #[error("Configuration error: {details}")]
    Configuration { details: String },
}

impl SourceError {
    /// Whether the next scheduled run has a chance of succeeding unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http { status, .. } => *status >= 500,
            SourceError::Network { retryable, .. } => *retryable,
            SourceError::RateLimited { .. } | SourceError::MalformedResponse { .. } => true,
            SourceError::Authentication { .. } | SourceError::Configuration { .. } => false,
        }
    }
}

/// Cursor for pagination through a record source.
///
/// Wraps an opaque JSON payload returned by the source. The payload must
/// round-trip without alteration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Cursor(pub serde_json::Value);

impl Cursor {
    /// Convenience helper to build a string cursor.
    pub fn from_string<S: Into<String>>(value: S) -> Self {
        Self(serde_json::Value::String(value.into()))
    }

    /// Attempt to access the cursor as a string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

/// Filters for a single page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFilters {
    /// Continuation cursor; `None` requests the first page
    pub cursor: Option<Cursor>,
    /// Maximum records per page
    pub page_size: u32,
    /// Inclusive lower bound on the schema's last-modified field
    pub modified_since: Option<DateTime<Utc>>,
}

impl FetchFilters {
    pub fn first_page(page_size: u32, modified_since: Option<DateTime<Utc>>) -> Self {
        Self {
            cursor: None,
            page_size,
            modified_since,
        }
    }
}

/// A record as returned by the source: an id, its creation time and an
/// untyped field map keyed by source column name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceRecord {
    pub id: String,
    #[serde(rename = "createdTime", default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// One page of records plus pagination state
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<SourceRecord>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one page of records from the table named by `schema`.
    async fn fetch_page(
        &self,
        schema: &EntitySchema,
        filters: &FetchFilters,
    ) -> Result<RecordPage, SourceError>;
}

/// Builds a [`RecordSource`] for a VA from its stored connection parameters.
pub trait RecordSourceFactory: Send + Sync {
    fn connect(
        &self,
        va_id: Uuid,
        connection: &AirtableConnection,
    ) -> Result<Arc<dyn RecordSource>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_display_includes_retry_hint() {
        let err = SourceError::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded (retry after: 30s)");

        let err = SourceError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn http_display_falls_back_when_body_missing() {
        let err = SourceError::Http {
            status: 502,
            body: None,
        };
        assert_eq!(err.to_string(), "HTTP error 502: No body");
        assert!(err.is_transient());
    }

    #[test]
    fn auth_and_config_errors_are_not_transient() {
        assert!(
            !SourceError::Authentication {
                status: 401,
                details: "nope".into()
            }
            .is_transient()
        );
        assert!(
            !SourceError::Configuration {
                details: "missing base id".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn cursor_round_trips_as_plain_string() {
        let cursor = Cursor::from_string("itrABC/recXYZ");
        let json = serde_json::to_value(&cursor).unwrap();
        assert_eq!(json, serde_json::json!("itrABC/recXYZ"));
        let back: Cursor = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_str(), Some("itrABC/recXYZ"));
    }

    #[test]
    fn source_record_deserializes_airtable_shape() {
        let record: SourceRecord = serde_json::from_value(serde_json::json!({
            "id": "rec1",
            "createdTime": "2024-03-01T10:00:00.000Z",
            "fields": { "Callsign": "UAL123" }
        }))
        .unwrap();
        assert_eq!(record.id, "rec1");
        assert!(record.created_time.is_some());
        assert_eq!(record.fields["Callsign"], "UAL123");
    }
}
