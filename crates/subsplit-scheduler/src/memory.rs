//! In-process job queue.
//!
//! Mirrors the Redis list semantics without a server. Nothing survives a
//! restart, so this is for tests and local experiments only.

use async_trait::async_trait;
use std::collections::VecDeque;
use subsplit_core::queue::{JobQueue, OutcomeRecord, QueueStats};
use subsplit_core::{Error, JobPayload, Result};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Default)]
struct State {
    /// Oldest job at the front.
    incoming: VecDeque<JobPayload>,
    processing: Vec<JobPayload>,
    records: Vec<OutcomeRecord>,
    unavailable: bool,
}

/// Job queue held in memory.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    state: Mutex<State>,
    available: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a queue error, as an unreachable
    /// backend would.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
        if !unavailable {
            self.available.notify_one();
        }
    }

    /// Outcome records stored so far.
    pub async fn records(&self) -> Vec<OutcomeRecord> {
        self.state.lock().await.records.clone()
    }

    fn check(state: &State) -> Result<()> {
        if state.unavailable {
            return Err(Error::Queue("queue unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, payload: &JobPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        state.incoming.push_back(payload.clone());
        self.available.notify_one();
        Ok(())
    }

    async fn claim(&self) -> Result<JobPayload> {
        loop {
            let notified = self.available.notified();
            {
                let mut state = self.state.lock().await;
                Self::check(&state)?;
                if let Some(payload) = state.incoming.pop_front() {
                    state.processing.push(payload.clone());
                    return Ok(payload);
                }
            }
            notified.await;
        }
    }

    async fn resolve(&self, payload: &JobPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        if let Some(index) = state.processing.iter().position(|p| p == payload) {
            state.processing.remove(index);
        }
        Ok(())
    }

    async fn requeue(&self, payload: &JobPayload) -> Result<bool> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        let Some(index) = state.processing.iter().position(|p| p == payload) else {
            return Ok(false);
        };
        let payload = state.processing.remove(index);
        state.incoming.push_front(payload);
        self.available.notify_one();
        Ok(true)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let state = self.state.lock().await;
        Self::check(&state)?;
        Ok(QueueStats {
            incoming: state.incoming.len(),
            processing: state.processing.len(),
        })
    }

    async fn incoming(&self) -> Result<Vec<JobPayload>> {
        let state = self.state.lock().await;
        Self::check(&state)?;
        Ok(state.incoming.iter().cloned().collect())
    }

    async fn in_flight(&self) -> Result<Vec<JobPayload>> {
        let state = self.state.lock().await;
        Self::check(&state)?;
        Ok(state.processing.clone())
    }

    async fn record(&self, outcome: &OutcomeRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::check(&state)?;
        state.records.push(outcome.clone());
        Ok(())
    }
}
