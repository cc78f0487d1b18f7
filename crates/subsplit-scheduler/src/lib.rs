//! Job queue and worker loop for the subsplit publisher.
//!
//! Jobs live in a Redis list pair. The single worker claims them with
//! `BRPOPLPUSH`, so a claimed job stays visible in the in-flight list until
//! it has been resolved.

pub mod memory;
pub mod queue;
pub mod worker;

pub use memory::MemoryJobQueue;
pub use queue::{QueueKeys, RedisJobQueue};
pub use worker::{JobOutcome, SkipReason, Worker, WorkerSettings};
