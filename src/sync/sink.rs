//! Record sinks
//!
//! A sync job hands every transformed record to a [`RecordSink`] chosen when the
//! job is built. [`UpsertSink`] writes the row immediately; [`StreamSink`]
//! publishes it to a per-VA Redis stream for [`super::PirepStreamConsumer`].

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Mutex;

use async_trait::async_trait;
use fred::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::error::SinkError;
use crate::repositories::{PirepRecord, UpsertRepository};

/// Stream entry field carrying the JSON-encoded record
pub const PAYLOAD_FIELD: &str = "payload";

#[async_trait]
pub trait RecordSink<R>: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn accept(&self, record: R) -> Result<(), SinkError>;
}

/// Sink that upserts through a repository
pub struct UpsertSink<Repo> {
    repo: Repo,
}

impl<Repo> UpsertSink<Repo> {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R, Repo> RecordSink<R> for UpsertSink<Repo>
where
    R: Send + Sync + 'static,
    Repo: UpsertRepository<R>,
{
    fn name(&self) -> &'static str {
        "upsert"
    }

    async fn accept(&self, record: R) -> Result<(), SinkError> {
        self.repo.upsert(&record).await?;
        Ok(())
    }
}

/// Records that can be routed onto a per-VA stream
pub trait StreamRecord: Serialize + Send + Sync {
    fn va_id(&self) -> Uuid;
}

impl StreamRecord for PirepRecord {
    fn va_id(&self) -> Uuid {
        self.va_id
    }
}

/// Stream key for a VA: `<prefix>:<va_id>`
pub fn stream_key(prefix: &str, va_id: Uuid) -> String {
    format!("{prefix}:{va_id}")
}

/// Connects a Redis pool for stream publishing or consumption.
pub async fn connect_pool(redis_url: &str, size: usize) -> Result<Pool, Error> {
    let config = Config::from_url(redis_url)?;
    let pool = Pool::new(config, None, None, None, size.max(1))?;

    pool.connect();
    pool.wait_for_connect().await?;

    Ok(pool)
}

/// Creates the consumer group (and the stream) if it does not exist yet.
pub async fn ensure_group(pool: &Pool, key: &str, group: &str) -> Result<(), Error> {
    let created: Result<(), Error> = pool.xgroup_create(key, group, "$", true).await;
    match created {
        Ok(()) => Ok(()),
        Err(err) if err.details().contains("BUSYGROUP") => Ok(()),
        Err(err) => Err(err),
    }
}

/// Sink that publishes records onto `<prefix>:<va_id>` streams
pub struct StreamSink<R> {
    pool: Pool,
    prefix: String,
    group: String,
    ready: Mutex<HashSet<String>>,
    _record: PhantomData<fn(R)>,
}

impl<R> StreamSink<R> {
    pub fn new(pool: Pool, prefix: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            group: group.into(),
            ready: Mutex::new(HashSet::new()),
            _record: PhantomData,
        }
    }

    fn is_ready(&self, key: &str) -> bool {
        self.ready
            .lock()
            .map(|ready| ready.contains(key))
            .unwrap_or(false)
    }

    fn mark_ready(&self, key: String) {
        if let Ok(mut ready) = self.ready.lock() {
            ready.insert(key);
        }
    }
}

#[async_trait]
impl<R> RecordSink<R> for StreamSink<R>
where
    R: StreamRecord + 'static,
{
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn accept(&self, record: R) -> Result<(), SinkError> {
        let key = stream_key(&self.prefix, record.va_id());
        if !self.is_ready(&key) {
            ensure_group(&self.pool, &key, &self.group).await?;
            self.mark_ready(key.clone());
        }

        let payload = serde_json::to_string(&record)?;
        let id: String = self
            .pool
            .xadd(&key, false, None, "*", vec![(PAYLOAD_FIELD, payload)])
            .await?;
        tracing::trace!(stream = %key, entry_id = %id, "Enqueued record");
        Ok(())
    }
}
