//! Database connection and pool management.
//!
//! Builds the SeaORM pool shared by the sync jobs, the linker and the stream
//! consumer. The service usually starts next to its database container, so
//! the first connection is retried a configurable number of times.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::AppConfig;

/// Upper bound for a single retry delay
const MAX_CONNECT_BACKOFF: Duration = Duration::from_secs(10);

/// Errors that can occur during database setup.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database after {attempts} attempt(s): {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: sea_orm::DbErr,
    },
    #[error("invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Delay after failed attempt number `attempt` (1-based): `base` doubled for
/// every earlier failure, capped at [`MAX_CONNECT_BACKOFF`].
pub fn connect_backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_CONNECT_BACKOFF)
}

fn connect_options(cfg: &AppConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);
    opt
}

/// Opens the connection pool, retrying up to `DB_CONNECT_ATTEMPTS` times.
///
/// ```no_run
/// use va_sync::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     # drop(db);
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.trim().is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "database URL cannot be empty".to_string(),
        }
        .into());
    }
    if cfg.db_connect_attempts == 0 {
        return Err(DatabaseError::InvalidConfiguration {
            message: "at least one connect attempt is required".to_string(),
        }
        .into());
    }

    let opt = connect_options(cfg);
    let attempts = cfg.db_connect_attempts;
    let mut attempt = 1;
    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                info!(attempt, max_connections = cfg.db_max_connections, "Connected to database");
                return Ok(conn);
            }
            Err(source) if attempt >= attempts => {
                error!(attempts, error = %source, "Giving up on database connection");
                return Err(DatabaseError::ConnectionFailed { attempts, source }.into());
            }
            Err(err) => {
                let delay = connect_backoff(cfg.db_connect_backoff(), attempt);
                warn!(
                    attempt,
                    attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "Database connection attempt failed"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Verifies the connection is alive with `SELECT 1`.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    db.query_one(stmt)
        .await
        .context("database health check failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_database_url_is_rejected() {
        let mut config = AppConfig::default();
        config.database_url = "  ".to_string();

        let result = init_pool(&config).await;
        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let base = Duration::from_millis(100);
        assert_eq!(connect_backoff(base, 1), Duration::from_millis(100));
        assert_eq!(connect_backoff(base, 2), Duration::from_millis(200));
        assert_eq!(connect_backoff(base, 4), Duration::from_millis(800));
        assert_eq!(connect_backoff(base, 40), MAX_CONNECT_BACKOFF);
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let mut config = AppConfig::default();
        // Unsupported scheme fails immediately on every attempt.
        config.database_url = "nosuchdb://localhost/va".to_string();
        config.db_connect_attempts = 2;
        config.db_connect_backoff_ms = 1;

        let err = init_pool(&config).await.unwrap_err();
        match err.downcast::<DatabaseError>() {
            Ok(DatabaseError::ConnectionFailed { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_passes_on_sqlite() {
        let mut config = AppConfig::default();
        config.database_url = "sqlite::memory:".to_string();
        config.db_max_connections = 1;
        config.db_connect_attempts = 1;

        let db = init_pool(&config).await.unwrap();
        assert!(health_check(&db).await.is_ok());
    }
}
