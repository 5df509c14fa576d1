//! # VA Sync entry point
//!
//! `serve` runs the scheduler (and the PIREP stream consumer when the queue is
//! enabled) until Ctrl-C. The other subcommands are one-shot manual triggers.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use va_sync::{
    config::{AppConfig, ConfigLoader},
    connectors::{AirtableConnector, RecordSourceFactory},
    db,
    migration::{Migrator, MigratorTrait},
    repositories::PirepRecord,
    scheduler::{ScheduledSync, SyncScheduler},
    schema::EntityKind,
    sync::{
        EntitySync, PilotLinker, Pilots, PirepStreamConsumer, Pireps, Routes, StreamSink, SyncJob,
        consumer::ConsumerConfig, sink::connect_pool,
    },
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "va-sync")]
#[command(about = "Airtable to Postgres sync for virtual airlines")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the scheduled sync jobs until interrupted
    Serve,
    /// Sync one entity kind now
    Sync {
        /// pilots, routes or pireps
        entity: EntityKind,
        /// Limit the run to one virtual airline
        #[arg(long)]
        va: Option<Uuid>,
    },
    /// Link registered members to synced pilots by callsign
    Link {
        #[arg(long)]
        va: Option<Uuid>,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    config.validate().context("validating configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = Arc::new(
        db::init_pool(&config)
            .await
            .context("initializing database connection pool")?,
    );
    db::health_check(&db)
        .await
        .context("checking database connectivity")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            Migrator::up(db.as_ref(), None)
                .await
                .context("applying migrations")?;
            info!("Migrations applied");
        }
        Commands::Link { va } => {
            let linker = PilotLinker::new(db);
            let report = match va {
                Some(va_id) => linker.run_for_va(va_id).await?,
                None => linker.run_all().await,
            };
            println!(
                "link complete: examined={} linked={}",
                report.examined, report.linked
            );
        }
        Commands::Sync { entity, va } => {
            let sources = airtable_sources(&config)?;
            let synced = match entity {
                EntityKind::Pilot => run_once::<Pilots>(upsert_job(&config, &db, &sources), va).await?,
                EntityKind::Route => run_once::<Routes>(upsert_job(&config, &db, &sources), va).await?,
                EntityKind::Pirep => run_once::<Pireps>(pirep_job(&config, &db, &sources).await?, va).await?,
            };
            println!("sync complete: entity={} synced={}", entity, synced);
        }
        Commands::Serve => serve(&config, db).await?,
    }

    Ok(())
}

async fn serve(config: &AppConfig, db: Arc<DatabaseConnection>) -> Result<()> {
    let sources = airtable_sources(config)?;
    let schedule = &config.scheduler;

    let pilots: Arc<dyn ScheduledSync> = Arc::new(upsert_job::<Pilots>(config, &db, &sources));
    let routes: Arc<dyn ScheduledSync> = Arc::new(upsert_job::<Routes>(config, &db, &sources));
    let pireps: Arc<dyn ScheduledSync> = Arc::new(pirep_job(config, &db, &sources).await?);

    let scheduler = SyncScheduler::new(db.clone(), schedule)
        .with_job(pilots, Duration::from_secs(schedule.pilot_sync_interval_seconds))
        .with_job(routes, Duration::from_secs(schedule.route_sync_interval_seconds))
        .with_job(pireps, Duration::from_secs(schedule.pirep_sync_interval_seconds));

    let shutdown = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(scheduler.run(shutdown.child_token()));

    if config.queue.pirep_queue_enabled {
        let redis_url = config
            .queue
            .redis_url
            .as_deref()
            .context("PIREP queue enabled without a Redis URL")?;
        // XREADGROUP blocks its connection, so the consumer gets its own pool.
        let pool = connect_pool(redis_url, 1)
            .await
            .context("connecting PIREP consumer to Redis")?;
        let consumer = PirepStreamConsumer::new(
            pool,
            db.clone(),
            ConsumerConfig {
                stream_prefix: config.queue.pirep_stream_prefix.clone(),
                group: config.queue.pirep_consumer_group.clone(),
                consumer: config.queue.pirep_consumer_name.clone(),
                max_deliveries: config.queue.pirep_max_deliveries,
                reclaim_interval: Duration::from_secs(config.queue.pirep_reclaim_interval_seconds),
                ..ConsumerConfig::default()
            },
        );
        tasks.spawn(consumer.run(shutdown.child_token()));
    }

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("Shutdown signal received, waiting for in-flight work");
    shutdown.cancel();

    while let Some(joined) = tasks.join_next().await {
        joined.context("background task panicked")?;
    }
    Ok(())
}

fn airtable_sources(config: &AppConfig) -> Result<Arc<dyn RecordSourceFactory>> {
    let connector = AirtableConnector::new(
        &config.airtable_api_base,
        config.airtable_api_key.clone(),
        config.airtable_timeout(),
    )
    .context("building Airtable client")?;
    Ok(Arc::new(connector))
}

fn upsert_job<E: EntitySync>(
    config: &AppConfig,
    db: &Arc<DatabaseConnection>,
    sources: &Arc<dyn RecordSourceFactory>,
) -> SyncJob<E> {
    SyncJob::<E>::with_upsert(db.clone(), sources.clone()).with_page_size(config.airtable_page_size)
}

/// PIREP job; publishes to Redis streams instead of upserting when the queue is on.
async fn pirep_job(
    config: &AppConfig,
    db: &Arc<DatabaseConnection>,
    sources: &Arc<dyn RecordSourceFactory>,
) -> Result<SyncJob<Pireps>> {
    if !config.queue.pirep_queue_enabled {
        return Ok(upsert_job::<Pireps>(config, db, sources));
    }
    let redis_url = config
        .queue
        .redis_url
        .as_deref()
        .context("PIREP queue enabled without a Redis URL")?;
    let pool = connect_pool(redis_url, 2)
        .await
        .context("connecting PIREP publisher to Redis")?;
    let sink = Arc::new(StreamSink::<PirepRecord>::new(
        pool,
        config.queue.pirep_stream_prefix.clone(),
        config.queue.pirep_consumer_group.clone(),
    ));
    Ok(SyncJob::<Pireps>::new(db.clone(), sources.clone(), sink)
        .with_page_size(config.airtable_page_size))
}

async fn run_once<E: EntitySync>(job: SyncJob<E>, va: Option<Uuid>) -> Result<u64> {
    match va {
        Some(va_id) => {
            let outcome = job
                .run_for_va(va_id)
                .await
                .with_context(|| format!("syncing {} for VA {}", E::KIND, va_id))?;
            info!(?outcome, "Manual sync finished");
            Ok(outcome.synced())
        }
        None => Ok(job.run_all().await),
    }
}
