//! Application state.

use std::sync::Arc;
use subsplit_core::queue::JobQueue;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn JobQueue>,
    /// Secret for `X-Hub-Signature-256` checks; `None` accepts any body.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            queue,
            webhook_secret: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret.filter(|s| !s.is_empty()).map(Arc::from);
        self
    }
}
