//! Job queue implementation using Redis.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError, RedisResult};
use subsplit_config::RedisConfig;
use subsplit_core::queue::{JobQueue, OutcomeRecord, QueueStats};
use subsplit_core::{Error, JobPayload, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Server-side wait of one `BRPOPLPUSH` round, in seconds. `claim` keeps
/// issuing rounds until a job shows up.
const CLAIM_WAIT_SECS: u64 = 5;

/// Moves a payload from the in-flight list back to the claim end of the
/// intake list, only if it was actually in flight.
const REQUEUE_SCRIPT: &str = r"
if redis.call('LREM', KEYS[1], 1, ARGV[1]) == 1 then
    redis.call('RPUSH', KEYS[2], ARGV[1])
    return 1
end
return 0
";

/// Names of the Redis lists under one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    prefix: String,
}

impl QueueKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn incoming(&self) -> String {
        format!("{}:incoming", self.prefix)
    }

    pub fn processing(&self) -> String {
        format!("{}:processing", self.prefix)
    }

    pub fn processed(&self) -> String {
        format!("{}:processed", self.prefix)
    }

    pub fn failures(&self) -> String {
        format!("{}:failures", self.prefix)
    }
}

/// Job queue backed by a pair of Redis lists.
///
/// Intake pushes with `LPUSH`; the worker claims with `BRPOPLPUSH` and
/// resolves with `LREM`. The blocking claim runs on its own connection so it
/// never holds up intake writes.
pub struct RedisJobQueue {
    client: redis::Client,
    keys: QueueKeys,
    record_outcomes: bool,
    commands: Mutex<Option<MultiplexedConnection>>,
    blocking: Mutex<Option<MultiplexedConnection>>,
}

impl RedisJobQueue {
    pub fn new(client: redis::Client, keys: QueueKeys) -> Self {
        Self {
            client,
            keys,
            record_outcomes: false,
            commands: Mutex::new(None),
            blocking: Mutex::new(None),
        }
    }

    /// Build a queue from configuration. No connection is made until the
    /// first command.
    pub fn from_config(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(connection_url(config)?.as_str()).map_err(queue_error)?;
        Ok(Self::new(client, QueueKeys::new(config.prefix.clone()))
            .with_outcome_records(config.record_outcomes))
    }

    /// Keep outcome records in `<prefix>:processed` and `<prefix>:failures`.
    pub fn with_outcome_records(mut self, enabled: bool) -> Self {
        self.record_outcomes = enabled;
        self
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    async fn connection(
        &self,
        slot: &Mutex<Option<MultiplexedConnection>>,
    ) -> Result<MultiplexedConnection> {
        let mut slot = slot.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(queue_error)?;
        debug!(prefix = %self.keys.prefix(), "Connected to Redis");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Map a command result, dropping the cached connection if it broke.
    async fn settle<T>(
        &self,
        slot: &Mutex<Option<MultiplexedConnection>>,
        result: RedisResult<T>,
    ) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    warn!(error = %e, "Dropping Redis connection");
                    *slot.lock().await = None;
                }
                Err(queue_error(e))
            }
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, payload: &JobPayload) -> Result<()> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<i64> = conn.lpush(self.keys.incoming(), payload.as_bytes()).await;
        self.settle(&self.commands, result).await?;
        Ok(())
    }

    async fn claim(&self) -> Result<JobPayload> {
        loop {
            let mut conn = self.connection(&self.blocking).await?;
            let result: RedisResult<Option<Vec<u8>>> = redis::cmd("BRPOPLPUSH")
                .arg(self.keys.incoming())
                .arg(self.keys.processing())
                .arg(CLAIM_WAIT_SECS)
                .query_async(&mut conn)
                .await;
            if let Some(bytes) = self.settle(&self.blocking, result).await? {
                return Ok(JobPayload::new(bytes));
            }
        }
    }

    async fn resolve(&self, payload: &JobPayload) -> Result<()> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<i64> = conn
            .lrem(self.keys.processing(), 1, payload.as_bytes())
            .await;
        let removed = self.settle(&self.commands, result).await?;
        if removed == 0 {
            debug!(payload = %payload.lossy(), "Resolved payload was not in flight");
        }
        Ok(())
    }

    async fn requeue(&self, payload: &JobPayload) -> Result<bool> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<i64> = redis::Script::new(REQUEUE_SCRIPT)
            .key(self.keys.processing())
            .key(self.keys.incoming())
            .arg(payload.as_bytes())
            .invoke_async(&mut conn)
            .await;
        Ok(self.settle(&self.commands, result).await? == 1)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<(usize, usize)> = redis::pipe()
            .llen(self.keys.incoming())
            .llen(self.keys.processing())
            .query_async(&mut conn)
            .await;
        let (incoming, processing) = self.settle(&self.commands, result).await?;
        Ok(QueueStats {
            incoming,
            processing,
        })
    }

    async fn incoming(&self) -> Result<Vec<JobPayload>> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<Vec<Vec<u8>>> = conn.lrange(self.keys.incoming(), 0, -1).await;
        // LPUSH puts the newest entry at the head
        let mut items = self.settle(&self.commands, result).await?;
        items.reverse();
        Ok(items.into_iter().map(JobPayload::new).collect())
    }

    async fn in_flight(&self) -> Result<Vec<JobPayload>> {
        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<Vec<Vec<u8>>> = conn.lrange(self.keys.processing(), 0, -1).await;
        let items = self.settle(&self.commands, result).await?;
        Ok(items.into_iter().map(JobPayload::new).collect())
    }

    async fn record(&self, outcome: &OutcomeRecord) -> Result<()> {
        if !self.record_outcomes {
            return Ok(());
        }
        let json = serde_json::to_string(outcome)
            .map_err(|e| Error::Internal(format!("failed to serialize outcome: {}", e)))?;

        let mut conn = self.connection(&self.commands).await?;
        let result: RedisResult<i64> = if outcome.outcome.is_success() {
            conn.rpush(self.keys.processed(), json).await
        } else {
            conn.lpush(self.keys.failures(), json).await
        };
        self.settle(&self.commands, result).await?;
        Ok(())
    }
}

/// `redis://[:password@]host/db` for the configured server.
fn connection_url(config: &RedisConfig) -> Result<url::Url> {
    let mut url = url::Url::parse(&format!("redis://{}/{}", config.host, config.db))
        .map_err(|e| Error::InvalidInput(format!("invalid redis host {}: {}", config.host, e)))?;
    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| Error::InvalidInput(format!("invalid redis host {}", config.host)))?;
    }
    Ok(url)
}

fn queue_error(err: RedisError) -> Error {
    Error::Queue(err.to_string())
}
