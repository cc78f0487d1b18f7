//! Worker that processes push hooks from the queue.

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subsplit_config::SplitterConfig;
use subsplit_core::executor::{SplitExecutor, SplitRequest};
use subsplit_core::notifier::Notifier;
use subsplit_core::queue::{JobQueue, OutcomeKind, OutcomeRecord};
use subsplit_core::{JobPayload, Result, SplitInstruction, SplitSet, classify};
use tracing::{error, info, warn};

/// What the worker needs to know about the monorepo.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub working_dir: PathBuf,
    pub repository_url: String,
    pub split_set: SplitSet,
}

impl WorkerSettings {
    pub fn from_config(config: &SplitterConfig) -> Self {
        Self {
            working_dir: config.working_directory.clone(),
            repository_url: config.url.clone(),
            split_set: config.split_set(),
        }
    }
}

/// Why a job was dropped without splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Decode(String),
    UnsupportedRepository(String),
    UnrecognizedReference(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Decode(e) => write!(f, "error while decoding the hook: {}", e),
            SkipReason::UnsupportedRepository(url) => {
                write!(f, "the repository {} is not supported", url)
            }
            SkipReason::UnrecognizedReference(r) => {
                write!(f, "unexpected reference detected: {}", r)
            }
        }
    }
}

/// How a claimed job ended.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Split {
        instruction: SplitInstruction,
        elapsed: Duration,
    },
    Failed {
        instruction: SplitInstruction,
        elapsed: Duration,
        error: String,
    },
    Skipped(SkipReason),
}

impl JobOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            JobOutcome::Split { .. } => OutcomeKind::Split,
            JobOutcome::Failed { .. } => OutcomeKind::Failed,
            JobOutcome::Skipped(_) => OutcomeKind::Skipped,
        }
    }

    fn record(&self, payload: &JobPayload) -> OutcomeRecord {
        let (reason, instruction) = match self {
            JobOutcome::Split { instruction, .. } => (None, Some(instruction.clone())),
            JobOutcome::Failed {
                instruction, error, ..
            } => (Some(error.clone()), Some(instruction.clone())),
            JobOutcome::Skipped(reason) => (Some(reason.to_string()), None),
        };
        OutcomeRecord {
            payload: payload.lossy().into_owned(),
            outcome: self.kind(),
            reason,
            instruction,
            processed_at: Utc::now(),
        }
    }
}

/// A single worker running the claim, split, resolve cycle.
///
/// Jobs are handled strictly one after the other: the next claim is only
/// issued once the previous job has been resolved.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    executor: Arc<dyn SplitExecutor>,
    notifier: Arc<dyn Notifier>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        executor: Arc<dyn SplitExecutor>,
        notifier: Arc<dyn Notifier>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            executor,
            notifier,
            settings,
        }
    }

    /// Run the worker loop forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending()).await
    }

    /// Run the worker loop until `shutdown` completes. Shutdown is only
    /// observed while waiting for a job; a job in progress is always
    /// finished and resolved first.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        info!(
            executor = self.executor.name(),
            repository = %self.settings.repository_url,
            split = %self.settings.split_set.joined(),
            "Starting worker"
        );
        tokio::pin!(shutdown);

        loop {
            info!("Waiting for a new push to split...");
            let claimed = tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping worker");
                    return;
                }
                claimed = self.queue.claim() => claimed,
            };

            match claimed {
                Ok(payload) => {
                    self.process(payload).await;
                }
                Err(e) => {
                    // Nothing was claimed; try again straight away.
                    error!(error = %e, "Error while waiting for a message. Retrying...");
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    /// Claim one job and process it.
    pub async fn process_next(&self) -> Result<JobOutcome> {
        let payload = self.queue.claim().await?;
        Ok(self.process(payload).await)
    }

    /// Process a claimed job and resolve it.
    pub async fn process(&self, payload: JobPayload) -> JobOutcome {
        let start_time = Utc::now();
        info!("Processing start");

        let outcome = self.handle(&payload).await;
        if let JobOutcome::Skipped(reason) = &outcome {
            log_skip(reason, start_time);
        }

        self.resolve(&payload, &outcome).await;
        outcome
    }

    async fn handle(&self, payload: &JobPayload) -> JobOutcome {
        let started = Instant::now();

        let hook = match payload.decode() {
            Ok(hook) => hook,
            Err(e) => return JobOutcome::Skipped(SkipReason::Decode(e.to_string())),
        };

        if hook.repository.url != self.settings.repository_url {
            return JobOutcome::Skipped(SkipReason::UnsupportedRepository(hook.repository.url));
        }

        let Some(instruction) = classify(&hook.r#ref) else {
            return JobOutcome::Skipped(SkipReason::UnrecognizedReference(hook.r#ref));
        };

        self.notify_in_background(format!("Started: splitting modules for {}", instruction));

        let request = SplitRequest {
            working_dir: self.settings.working_dir.clone(),
            repository_url: self.settings.repository_url.clone(),
            split_set: self.settings.split_set.clone(),
            instruction: instruction.clone(),
        };
        let result = self.executor.execute(&request).await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                let message = format!("Finished: splitting modules. It took {:.2?}", elapsed);
                info!(%instruction, ?elapsed, "{}", message);
                self.notify_in_background(message);
                JobOutcome::Split {
                    instruction,
                    elapsed,
                }
            }
            Err(e) => {
                error!(
                    split = %request.split_set.joined(),
                    %instruction,
                    error = %e,
                    "Error while splitting"
                );
                self.notify_in_background(format!(
                    "Finished with errors: splitting modules. It took {:.2?}",
                    elapsed
                ));
                JobOutcome::Failed {
                    instruction,
                    elapsed,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Remove the job from the in-flight list and keep the outcome record.
    async fn resolve(&self, payload: &JobPayload, outcome: &JobOutcome) {
        if let Err(e) = self.queue.resolve(payload).await {
            error!(error = %e, payload = %payload.lossy(), "Failed to resolve job");
        }
        if let Err(e) = self.queue.record(&outcome.record(payload)).await {
            warn!(error = %e, "Failed to record job outcome");
        }
    }

    /// Send a notification without waiting for it. Failures are logged and
    /// never reach the job.
    fn notify_in_background(&self, text: String) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                warn!(error = %e, "Failed to send notification");
            }
        });
    }
}

fn log_skip(reason: &SkipReason, start_time: DateTime<Utc>) {
    let start_time = start_time.to_rfc3339();
    let end_time = Utc::now().to_rfc3339();
    match reason {
        SkipReason::Decode(_) => {
            error!(%start_time, %end_time, "Skipping request: {}", reason)
        }
        _ => info!(%start_time, %end_time, "Skipping request: {}", reason),
    }
}
