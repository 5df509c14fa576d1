//! # Sync Scheduler
//!
//! Runs each entity sync job on its own fixed interval in a long-lived task.
//! On startup a job's first run is skipped when any VA already synced that
//! entity within the configured recency window, so frequent restarts do not
//! hammer Airtable. The pilot linker runs once at startup and after every
//! scheduled pilot tick.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::repositories::SyncHistoryRepository;
use crate::schema::EntityKind;
use crate::sync::{EntitySync, PilotLinker, SyncJob};

/// Object-safe view of a [`SyncJob`] so jobs of different entity kinds can
/// share one scheduler.
#[async_trait]
pub trait ScheduledSync: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Sync every active VA; returns records synced.
    async fn run_all(&self) -> u64;
}

#[async_trait]
impl<E: EntitySync> ScheduledSync for SyncJob<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    async fn run_all(&self) -> u64 {
        SyncJob::run_all(self).await
    }
}

struct ScheduledJob {
    job: Arc<dyn ScheduledSync>,
    every: Duration,
}

/// Background scheduler service.
pub struct SyncScheduler {
    history: SyncHistoryRepository,
    linker: Arc<PilotLinker>,
    jobs: Vec<ScheduledJob>,
    startup_skip_window: Duration,
}

impl SyncScheduler {
    pub fn new(db: Arc<DatabaseConnection>, config: &SchedulerConfig) -> Self {
        Self {
            history: SyncHistoryRepository::new(db.clone()),
            linker: Arc::new(PilotLinker::new(db)),
            jobs: Vec::new(),
            startup_skip_window: config.startup_skip_window(),
        }
    }

    /// Register a job to run every `every`.
    pub fn with_job(mut self, job: Arc<dyn ScheduledSync>, every: Duration) -> Self {
        self.jobs.push(ScheduledJob {
            job,
            every: every.max(Duration::from_secs(1)),
        });
        self
    }

    /// Run all registered jobs until the shutdown token fires.
    ///
    /// A run already in progress finishes before its task exits.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(jobs = self.jobs.len(), "Starting sync scheduler");

        let startup_links = self.linker.run_all().await;
        info!(
            examined = startup_links.examined,
            linked = startup_links.linked,
            "Startup pilot linking completed"
        );

        let mut tasks = JoinSet::new();
        for scheduled in self.jobs {
            let kind = scheduled.job.kind();
            let skip_first = match self.history.get_last_sync_time_for_event(kind.event_type()).await {
                Ok(last) => recently_synced(last, Utc::now(), self.startup_skip_window),
                Err(err) => {
                    warn!(entity = %kind, error = %err, "Could not read sync history; running initial sync");
                    false
                }
            };
            let linker = (kind == EntityKind::Pilot).then(|| self.linker.clone());
            tasks.spawn(run_job_loop(
                scheduled,
                linker,
                skip_first,
                shutdown.child_token(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Scheduled sync task aborted");
            }
        }

        info!("Sync scheduler stopped");
    }
}

async fn run_job_loop(
    scheduled: ScheduledJob,
    linker: Option<Arc<PilotLinker>>,
    skip_first: bool,
    shutdown: CancellationToken,
) {
    let kind = scheduled.job.kind();
    let start = if skip_first {
        info!(entity = %kind, "Recent sync found, skipping initial run");
        Instant::now() + scheduled.every
    } else {
        Instant::now()
    };
    let mut ticker = interval_at(start, scheduled.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(entity = %kind, "Scheduled sync shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let started = Instant::now();
                let synced = scheduled.job.run_all().await;

                let labels = vec![("entity", kind.as_str().to_string())];
                counter!("va_sync_scheduler_ticks_total", &labels).increment(1);
                histogram!("va_sync_scheduler_tick_duration_ms", &labels)
                    .record(started.elapsed().as_secs_f64() * 1_000.0);
                info!(entity = %kind, synced, "Scheduled sync tick completed");

                // Link whether or not the pilot sync itself succeeded.
                if let Some(linker) = &linker {
                    let report = linker.run_all().await;
                    info!(
                        examined = report.examined,
                        linked = report.linked,
                        "Pilot linking completed"
                    );
                }
            }
        }
    }
}

/// Whether the most recent sync falls within `window` of `now`.
fn recently_synced(last: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    let Some(last) = last else {
        return false;
    };
    let Ok(window) = chrono::Duration::from_std(window) else {
        return false;
    };
    now.signed_duration_since(last) < window
}
