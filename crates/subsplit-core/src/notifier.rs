//! Chat notification trait.

use async_trait::async_trait;

use crate::Result;

/// Best-effort delivery of a free-text status message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}

/// Notifier used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}
