//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the sync pipeline's tables. Every repository takes an
//! injected connection handle and scopes its queries by VA.

use async_trait::async_trait;

use crate::error::RepositoryError;

pub mod pilot;
pub mod pirep;
pub mod provider_config;
pub mod route;
pub mod sync_history;
pub mod user_role;
pub mod virtual_airline;

pub use pilot::{PilotRecord, PilotRepository};
pub use pirep::{PirepRecord, PirepRepository};
pub use provider_config::ProviderConfigRepository;
pub use route::{RouteRecord, RouteRepository};
pub use sync_history::SyncHistoryRepository;
pub use user_role::UserRoleRepository;
pub use virtual_airline::VirtualAirlineRepository;

/// Idempotent insert-or-update keyed by (VA id, source record id).
///
/// On conflict every mutable column is overwritten; the surrogate id and
/// `created_at` of the existing row are kept.
#[async_trait]
pub trait UpsertRepository<R>: Send + Sync
where
    R: Send + Sync,
{
    async fn upsert(&self, record: &R) -> Result<(), RepositoryError>;
}
