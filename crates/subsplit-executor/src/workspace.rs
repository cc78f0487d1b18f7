//! Scratch workspace with guaranteed removal.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Permissions for newly created workspace directories.
#[cfg(unix)]
const WORKSPACE_MODE: u32 = 0o750;

/// A workspace directory that is removed when the guard goes away.
///
/// Call [`Workspace::remove`] to remove it and observe errors. If the guard
/// is dropped instead (early return, panic, cancelled future) the directory
/// is removed synchronously and errors are only logged.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    armed: bool,
}

impl Workspace {
    /// Create the directory and any missing parents. An existing directory
    /// is reused.
    pub async fn create(path: PathBuf) -> io::Result<Self> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(WORKSPACE_MODE);
        builder.create(&path).await?;

        debug!(path = %path.display(), "Workspace ready");
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace. A directory that is already gone is fine.
    pub async fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove workspace");
            }
        }
    }
}
