//! # Data Models
//!
//! SeaORM entities for the tables the sync pipeline reads and writes.

pub mod data_provider_config;
pub mod pilot;
pub mod pirep;
pub mod route;
pub mod sync_history;
pub mod user_role;
pub mod virtual_airline;

pub use data_provider_config::Entity as DataProviderConfig;
pub use pilot::Entity as Pilot;
pub use pirep::Entity as Pirep;
pub use route::Entity as Route;
pub use sync_history::Entity as SyncHistory;
pub use user_role::Entity as UserRole;
pub use virtual_airline::Entity as VirtualAirline;
