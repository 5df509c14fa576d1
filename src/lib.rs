//! # VA Sync Library
//!
//! Incremental Airtable → Postgres synchronization for virtual airlines:
//! record sources, schema mapping, the sync-history ledger, entity
//! repositories, sync jobs, pilot linking and the background scheduler.

pub mod config;
pub mod connectors;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod schema;
pub mod sync;
pub mod telemetry;
pub use migration;
