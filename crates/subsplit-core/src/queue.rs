//! Durable job queue trait and outcome records.
//!
//! The queue is a pair of lists: jobs are pushed onto the intake list and
//! atomically moved onto the in-flight list when claimed. A claimed job stays
//! in the in-flight list until it is resolved, so a worker crash leaves it
//! visible for manual replay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobPayload, Result, SplitInstruction};

/// Lengths of the two queue lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub incoming: usize,
    pub processing: usize,
}

/// How a job was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Split,
    Skipped,
    Failed,
}

impl OutcomeKind {
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::Split)
    }
}

/// Bookkeeping entry written after a job is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub payload: String,
    pub outcome: OutcomeKind,
    pub reason: Option<String>,
    pub instruction: Option<SplitInstruction>,
    pub processed_at: DateTime<Utc>,
}

/// The durable two-list queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push a payload onto the intake list.
    async fn enqueue(&self, payload: &JobPayload) -> Result<()>;

    /// Block until a job is available, then move it onto the in-flight list
    /// and return it.
    async fn claim(&self) -> Result<JobPayload>;

    /// Remove one occurrence of the payload from the in-flight list.
    /// Removing an absent payload is not an error.
    async fn resolve(&self, payload: &JobPayload) -> Result<()>;

    /// Move one occurrence of an in-flight payload back to the claim end of
    /// the intake list. Returns false if the payload was not in flight.
    async fn requeue(&self, payload: &JobPayload) -> Result<bool>;

    async fn stats(&self) -> Result<QueueStats>;

    /// Intake list contents, oldest first.
    async fn incoming(&self) -> Result<Vec<JobPayload>>;

    /// In-flight list contents.
    async fn in_flight(&self) -> Result<Vec<JobPayload>>;

    /// Store an outcome record, if the queue keeps them.
    async fn record(&self, outcome: &OutcomeRecord) -> Result<()>;
}
