//! Core domain types and traits for the subsplit publisher.
//!
//! This crate contains:
//! - Job payloads and the push hook they carry
//! - Reference classification into split instructions
//! - Split sets, workspace naming and publish filters
//! - The queue, executor and notifier seams used by the worker

pub mod error;
pub mod executor;
pub mod hook;
pub mod notifier;
pub mod queue;
pub mod reference;
pub mod split;

pub use error::{Error, Result};
pub use hook::{JobPayload, PushHook};
pub use reference::{SplitInstruction, classify};
pub use split::{PublishFilters, SplitSet};
