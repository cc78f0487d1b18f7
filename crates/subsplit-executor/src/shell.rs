//! Shell executor that drives `git subsplit`.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use subsplit_core::executor::{SplitExecutor, SplitRequest};
use subsplit_core::{Error, PublishFilters, Result, SplitInstruction, SplitSet};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::Workspace;

/// Default split tool command.
pub const DEFAULT_TOOL: &str = "git subsplit";

/// Number of stderr bytes kept in error messages.
const STDERR_TAIL: usize = 2048;

/// Split executor running the split tool through `sh -c`.
///
/// Each invocation runs `init` (tolerating an already initialised
/// workspace), `update` and `publish` as one conjunctive pipeline with the
/// workspace as current directory. The workspace is removed afterwards on
/// every path.
#[derive(Debug, Clone)]
pub struct ShellSplitExecutor {
    tool: String,
    parallelism: usize,
}

impl Default for ShellSplitExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl ShellSplitExecutor {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            parallelism: 1,
        }
    }

    /// Publish split targets one per invocation, at most `parallelism` at a
    /// time. Each target gets its own workspace. A value of 1 keeps the
    /// single invocation for the whole split set.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Build the shell pipeline for one invocation.
    pub fn script(&self, repository_url: &str, split_set: &SplitSet, filters: &PublishFilters) -> String {
        let tool = &self.tool;
        let [heads, tags] = filters.args();
        format!(
            "({tool} init {url} || true) && {tool} update && {tool} publish {split} {heads} {tags}",
            url = shell_quote(repository_url),
            split = shell_quote(&split_set.joined()),
            heads = shell_quote(&heads),
            tags = shell_quote(&tags),
        )
    }

    async fn run_split(
        &self,
        workspace_path: PathBuf,
        repository_url: &str,
        split_set: &SplitSet,
        instruction: &SplitInstruction,
    ) -> Result<()> {
        let split = split_set.joined();
        let workspace = Workspace::create(workspace_path)
            .await
            .map_err(|e| split_failed(&split, format!("failed to create workspace: {}", e)))?;

        let script = self.script(repository_url, split_set, &PublishFilters::from(instruction));
        info!(split = %split, workspace = %workspace.path().display(), %instruction, "Running split");
        debug!(script = %script, "Split pipeline");

        let outcome = run_pipeline(workspace.path(), &script).await;
        let cleanup = workspace.remove().await;

        outcome.map_err(|message| split_failed(&split, message))?;
        cleanup.map_err(|e| split_failed(&split, format!("failed to remove workspace: {}", e)))?;

        info!(split = %split, "Split published");
        Ok(())
    }

    async fn run_per_target(&self, request: &SplitRequest) -> Result<()> {
        let results: Vec<(String, Result<()>)> = stream::iter(request.split_set.singletons().enumerate())
            .map(|(index, target)| async move {
                let workspace_path = request
                    .split_set
                    .target_workspace_path(&request.working_dir, index);
                let result = self
                    .run_split(
                        workspace_path,
                        &request.repository_url,
                        &target,
                        &request.instruction,
                    )
                    .await;
                (target.joined(), result)
            })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|(target, result)| result.err().map(|e| format!("{}: {}", target, e)))
            .collect();

        if failures.is_empty() {
            return Ok(());
        }

        Err(split_failed(
            &request.split_set.joined(),
            format!(
                "{} of {} targets failed: {}",
                failures.len(),
                request.split_set.len(),
                failures.join("; ")
            ),
        ))
    }
}

#[async_trait]
impl SplitExecutor for ShellSplitExecutor {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn execute(&self, request: &SplitRequest) -> Result<()> {
        if request.split_set.is_empty() {
            return Err(Error::InvalidInput("split set is empty".to_string()));
        }

        if self.parallelism > 1 && request.split_set.len() > 1 {
            return self.run_per_target(request).await;
        }

        self.run_split(
            request.workspace_path(),
            &request.repository_url,
            &request.split_set,
            &request.instruction,
        )
        .await
    }
}

/// Run `sh -c <script>` in `dir`, returning a description of the failure.
async fn run_pipeline(dir: &Path, script: &str) -> std::result::Result<(), String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(script)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to spawn shell: {}", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!(output = %stdout.trim_end(), "Split tool output");
    }

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = tail(stderr.trim_end(), STDERR_TAIL);
    warn!(status = %output.status, stderr = %stderr, "Split tool failed");

    Err(match output.status.code() {
        Some(code) => format!("exit code {}: {}", code, stderr),
        None => format!("terminated by signal: {}", stderr),
    })
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

fn split_failed(split: &str, message: impl Into<String>) -> Error {
    Error::SplitFailed {
        split: split.to_string(),
        message: message.into(),
    }
}

/// Single-quote a value for `sh`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
