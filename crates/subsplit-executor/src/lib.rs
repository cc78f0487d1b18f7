//! Split execution backends for the subsplit publisher.
//!
//! Provides the shell executor that drives `git subsplit` inside a scratch
//! workspace, and the workspace guard that removes it afterwards.

pub mod shell;
pub mod workspace;

pub use shell::ShellSplitExecutor;
pub use subsplit_core::executor::{SplitExecutor, SplitRequest};
pub use workspace::Workspace;
