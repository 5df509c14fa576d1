//! PIREP stream consumer
//!
//! Downstream half of the PIREP queue. Reads every active VA's stream through
//! a consumer group, applies the same natural-key upsert as the inline path
//! and acknowledges what it applied.
//!
//! Entries that cannot be decoded are acknowledged and logged so they do not
//! sit in the pending list forever. Entries whose upsert fails stay pending and
//! are read again from this consumer's pending list at startup and every
//! `reclaim_interval`. After `max_deliveries` failed attempts an entry is
//! logged with its payload's record id and acknowledged.
//!
//! Delivery attempts are counted in memory, so a restart gives every pending
//! entry a fresh budget.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fred::prelude::*;
use metrics::counter;
use sea_orm::DatabaseConnection;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::sink::{PAYLOAD_FIELD, ensure_group, stream_key};
use crate::error::SinkError;
use crate::repositories::{
    PirepRecord, PirepRepository, UpsertRepository, VirtualAirlineRepository,
};

/// Stream key to its entries, each an entry id and its field map
type StreamEntries = HashMap<String, Vec<(String, HashMap<String, String>)>>;

/// Tuning for [`PirepStreamConsumer`]
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream_prefix: String,
    pub group: String,
    /// Consumer name inside the group. Pending entries belong to this name, so
    /// it has to be stable across restarts.
    pub consumer: String,
    /// Entries per XREADGROUP call
    pub batch_size: u64,
    /// How long XREADGROUP blocks waiting for entries
    pub block_ms: u64,
    /// Pause after a failed poll
    pub error_backoff: Duration,
    /// Failed applies of one entry before it is acknowledged and dropped
    pub max_deliveries: u64,
    /// Time between rereads of the pending list
    pub reclaim_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            stream_prefix: "va-sync:pireps".to_string(),
            group: "va-sync-pireps".to_string(),
            consumer: "va-sync-1".to_string(),
            batch_size: 100,
            block_ms: 2_000,
            error_backoff: Duration::from_secs(5),
            max_deliveries: 5,
            reclaim_interval: Duration::from_secs(60),
        }
    }
}

/// Which part of the stream a read covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFrom {
    /// Entries never delivered to the group
    New,
    /// Entries delivered to this consumer and not yet acknowledged
    Pending,
}

impl ReadFrom {
    /// XREADGROUP id for every stream in the read
    pub fn ids(self, streams: usize) -> Vec<&'static str> {
        let id = match self {
            ReadFrom::New => ">",
            ReadFrom::Pending => "0",
        };
        vec![id; streams]
    }

    /// Only new-entry reads may block; Redis ignores BLOCK for history reads.
    fn block_ms(self, configured: u64) -> Option<u64> {
        match self {
            ReadFrom::New => Some(configured),
            ReadFrom::Pending => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeStats {
    pub applied: u64,
    pub undecodable: u64,
    /// Failed applies left pending for another attempt
    pub failed: u64,
    /// Entries acknowledged after exhausting their delivery budget
    pub abandoned: u64,
}

/// What to do with an entry whose apply just failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedDelivery {
    /// Leave it pending; `attempt` applies have failed so far
    Retry { attempt: u64 },
    /// Acknowledge it and stop trying
    GiveUp { attempts: u64 },
}

/// Failed-apply counts per entry id
#[derive(Debug)]
pub struct DeliveryTracker {
    max_deliveries: u64,
    failures: HashMap<String, u64>,
}

impl DeliveryTracker {
    pub fn new(max_deliveries: u64) -> Self {
        Self {
            max_deliveries: max_deliveries.max(1),
            failures: HashMap::new(),
        }
    }

    pub fn record_failure(&mut self, entry_id: &str) -> FailedDelivery {
        let attempts = self.failures.entry(entry_id.to_string()).or_insert(0);
        *attempts += 1;
        let attempts = *attempts;
        if attempts >= self.max_deliveries {
            self.failures.remove(entry_id);
            FailedDelivery::GiveUp { attempts }
        } else {
            FailedDelivery::Retry { attempt: attempts }
        }
    }

    /// Forget an entry once it has been acknowledged
    pub fn settle(&mut self, entry_id: &str) {
        self.failures.remove(entry_id);
    }

    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

/// Decode the PIREP carried by one stream entry
pub fn decode_entry(fields: &HashMap<String, String>) -> Result<PirepRecord, String> {
    let payload = fields
        .get(PAYLOAD_FIELD)
        .ok_or_else(|| format!("missing `{PAYLOAD_FIELD}` field"))?;
    serde_json::from_str::<PirepRecord>(payload).map_err(|e| e.to_string())
}

pub struct PirepStreamConsumer {
    pool: Pool,
    pireps: PirepRepository,
    vas: VirtualAirlineRepository,
    config: ConsumerConfig,
    ready: Mutex<HashSet<String>>,
    deliveries: Mutex<DeliveryTracker>,
}

impl PirepStreamConsumer {
    pub fn new(pool: Pool, db: Arc<DatabaseConnection>, config: ConsumerConfig) -> Self {
        let deliveries = Mutex::new(DeliveryTracker::new(config.max_deliveries));
        Self {
            pool,
            pireps: PirepRepository::new(db.clone()),
            vas: VirtualAirlineRepository::new(db),
            config,
            ready: Mutex::new(HashSet::new()),
            deliveries,
        }
    }

    /// Consume until the shutdown token fires. A poll in progress is allowed to
    /// finish; its blocking read is bounded by `block_ms`.
    #[instrument(skip_all, fields(group = %self.config.group, consumer = %self.config.consumer))]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Starting PIREP stream consumer");
        // None forces a pending reread before the first new read.
        let mut last_reclaim: Option<Instant> = None;
        while !shutdown.is_cancelled() {
            let due = last_reclaim.is_none_or(|at| at.elapsed() >= self.config.reclaim_interval);
            let read = if due {
                last_reclaim = Some(Instant::now());
                self.reclaim_pending().await
            } else {
                self.poll_once().await
            };

            match read {
                Ok(stats) => {
                    if stats != ConsumeStats::default() {
                        debug!(
                            pending_read = due,
                            applied = stats.applied,
                            undecodable = stats.undecodable,
                            failed = stats.failed,
                            abandoned = stats.abandoned,
                            "Consumed PIREP entries"
                        );
                    }
                }
                Err(err) => {
                    error!(error = %err, pending_read = due, "PIREP stream poll failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }
        info!("PIREP stream consumer stopped");
    }

    /// Read one batch of new entries from every active VA's stream and apply it.
    pub async fn poll_once(&self) -> Result<ConsumeStats, SinkError> {
        self.read_and_apply(ReadFrom::New).await
    }

    /// Reread entries this consumer received but never acknowledged.
    pub async fn reclaim_pending(&self) -> Result<ConsumeStats, SinkError> {
        self.read_and_apply(ReadFrom::Pending).await
    }

    async fn read_and_apply(&self, from: ReadFrom) -> Result<ConsumeStats, SinkError> {
        let mut stats = ConsumeStats::default();

        let keys: Vec<String> = self
            .vas
            .list_active()
            .await?
            .iter()
            .map(|va| stream_key(&self.config.stream_prefix, va.id))
            .collect();
        if keys.is_empty() {
            if from == ReadFrom::New {
                sleep(Duration::from_millis(self.config.block_ms)).await;
            }
            return Ok(stats);
        }
        for key in &keys {
            self.ensure_ready(key).await?;
        }

        let ids = from.ids(keys.len());
        let response: StreamEntries = self
            .pool
            .xreadgroup_map(
                self.config.group.as_str(),
                self.config.consumer.as_str(),
                Some(self.config.batch_size),
                from.block_ms(self.config.block_ms),
                false,
                keys,
                ids,
            )
            .await?;

        for (key, entries) in response {
            for (entry_id, fields) in entries {
                self.apply_entry(&key, &entry_id, &fields, &mut stats).await?;
            }
        }

        for (outcome, count) in [
            ("applied", stats.applied),
            ("undecodable", stats.undecodable),
            ("failed", stats.failed),
            ("abandoned", stats.abandoned),
        ] {
            if count > 0 {
                counter!("va_sync_stream_entries_total", "outcome" => outcome).increment(count);
            }
        }
        Ok(stats)
    }

    async fn apply_entry(
        &self,
        key: &str,
        entry_id: &str,
        fields: &HashMap<String, String>,
        stats: &mut ConsumeStats,
    ) -> Result<(), SinkError> {
        let record = match decode_entry(fields) {
            Ok(record) => record,
            Err(reason) => {
                warn!(stream = %key, entry_id = %entry_id, reason = %reason, "Dropping undecodable PIREP entry");
                self.ack(key, entry_id).await?;
                stats.undecodable += 1;
                return Ok(());
            }
        };

        let err = match self.pireps.upsert(&record).await {
            Ok(()) => {
                self.ack(key, entry_id).await?;
                self.settle(entry_id);
                stats.applied += 1;
                return Ok(());
            }
            Err(err) => err,
        };

        match self.record_failure(entry_id) {
            FailedDelivery::Retry { attempt } => {
                error!(
                    stream = %key,
                    entry_id = %entry_id,
                    record_id = %record.airtable_record_id,
                    attempt,
                    error = %err,
                    "Failed to apply PIREP entry, leaving it pending"
                );
                stats.failed += 1;
            }
            FailedDelivery::GiveUp { attempts } => {
                error!(
                    stream = %key,
                    entry_id = %entry_id,
                    va_id = %record.va_id,
                    record_id = %record.airtable_record_id,
                    attempts,
                    error = %err,
                    "Giving up on PIREP entry; it will not be applied"
                );
                self.ack(key, entry_id).await?;
                stats.abandoned += 1;
            }
        }
        Ok(())
    }

    fn record_failure(&self, entry_id: &str) -> FailedDelivery {
        match self.deliveries.lock() {
            Ok(mut tracker) => tracker.record_failure(entry_id),
            // A poisoned tracker cannot count; keep the entry pending.
            Err(_) => FailedDelivery::Retry { attempt: 0 },
        }
    }

    fn settle(&self, entry_id: &str) {
        if let Ok(mut tracker) = self.deliveries.lock() {
            tracker.settle(entry_id);
        }
    }

    async fn ensure_ready(&self, key: &str) -> Result<(), SinkError> {
        let known = self
            .ready
            .lock()
            .map(|ready| ready.contains(key))
            .unwrap_or(false);
        if known {
            return Ok(());
        }
        ensure_group(&self.pool, key, &self.config.group).await?;
        if let Ok(mut ready) = self.ready.lock() {
            ready.insert(key.to_string());
        }
        Ok(())
    }

    async fn ack(&self, key: &str, entry_id: &str) -> Result<(), SinkError> {
        let _: i64 = self.pool.xack(key, self.config.group.as_str(), entry_id).await?;
        Ok(())
    }
}
