//! Split executor trait and request type.
//!
//! Executors run the external split tool for one job inside a scratch
//! workspace derived from the split set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Result, SplitInstruction, SplitSet};

/// Everything an executor needs to split and publish one push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    /// Root under which workspaces are created.
    pub working_dir: PathBuf,
    /// Monorepo the split tool reads from.
    pub repository_url: String,
    /// Targets to publish.
    pub split_set: SplitSet,
    /// Branch or tag to publish.
    pub instruction: SplitInstruction,
}

impl SplitRequest {
    pub fn workspace_path(&self) -> PathBuf {
        self.split_set.workspace_path(&self.working_dir)
    }
}

/// Trait for split execution backends.
#[async_trait]
pub trait SplitExecutor: Send + Sync {
    /// Get the name of this executor.
    fn name(&self) -> &'static str;

    /// Run the split to completion. The workspace is gone when this returns,
    /// whether or not the split succeeded.
    async fn execute(&self, request: &SplitRequest) -> Result<()>;
}
