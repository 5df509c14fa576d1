//! # Error Handling
//!
//! Error types for the layers of the sync pipeline. Source client errors live
//! next to the client contract in [`crate::connectors`].
//!
//! How errors propagate:
//! - [`RecordError`] and [`SinkError`] abort a single record and are counted.
//! - [`SyncError`] aborts one VA's run and is logged by the batch entry point.
//! - Absence of configuration is not an error; see [`crate::sync::SkipReason`].

use thiserror::Error;
use uuid::Uuid;

use crate::connectors::SourceError;

/// Errors raised by the repository layer
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A stored configuration document could not be parsed
    #[error("invalid {what} document for VA {va_id}: {details}")]
    InvalidDocument {
        va_id: Uuid,
        what: &'static str,
        details: String,
    },
}

/// Why a single source record could not be turned into a local row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The schema has no mapping for a required logical field
    #[error("required field `{field}` has no source mapping")]
    UnmappedField { field: &'static str },

    /// The mapped source column is absent or blank on this record
    #[error("required field `{field}` (source column `{column}`) is missing or empty")]
    MissingField { field: &'static str, column: String },

    /// The source value cannot be coerced into the column type
    #[error("field `{field}` has the wrong type: expected {expected}, found {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors raised when handing a record to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Broker command failed
    #[error("queue error: {0}")]
    Queue(#[from] fred::prelude::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that abort one VA's run of a sync job
#[derive(Debug, Error)]
pub enum SyncError {
    /// Page fetch failed; the ledger is not advanced
    #[error("record source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration or ledger lookup failed before any record was processed
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SyncError {
    /// Whether the next scheduled run can be expected to succeed without
    /// anyone changing configuration
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Source(err) => err.is_transient(),
            SyncError::Repository(RepositoryError::Database(_)) => true,
            SyncError::Repository(RepositoryError::InvalidDocument { .. }) => false,
        }
    }
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        SyncError::Repository(RepositoryError::Database(err))
    }
}

impl From<sea_orm::DbErr> for SinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        SinkError::Repository(RepositoryError::Database(err))
    }
}
