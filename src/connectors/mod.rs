//! Connectors module
//!
//! This module provides the record source abstraction including:
//! - The `RecordSource` trait for paginated access to an external table store
//! - The `RecordSourceFactory` trait that builds a source from per-VA settings
//! - The Airtable implementation of both

pub mod airtable;
pub mod trait_;

pub use airtable::{AirtableClient, AirtableConnector};
pub use trait_::{
    Cursor, FetchFilters, RecordPage, RecordSource, RecordSourceFactory, SourceError, SourceRecord,
};
