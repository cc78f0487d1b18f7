//! Chat notifications through a Slack-compatible incoming webhook.

use async_trait::async_trait;
use serde::Serialize;
use subsplit_config::{SlackConfig, SplitterConfig};
use subsplit_core::notifier::Notifier;
use subsplit_core::{Error, Result};
use tracing::debug;
use url::Url;

/// Body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage<'a> {
    pub channel: &'a str,
    pub username: &'a str,
    pub text: &'a str,
    pub icon_emoji: &'a str,
}

/// Posts status messages to a chat webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    endpoint: Url,
    identity: SlackConfig,
}

impl SlackNotifier {
    pub fn new(endpoint: Url, identity: SlackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            identity,
        }
    }

    /// Build a notifier from configuration. Returns `None` when no endpoint
    /// is configured.
    pub fn from_config(config: &SplitterConfig) -> Result<Option<Self>> {
        if !config.notifications_enabled() {
            return Ok(None);
        }
        let endpoint = Url::parse(&config.slack_url)
            .map_err(|e| Error::InvalidInput(format!("invalid slack_url: {}", e)))?;
        Ok(Some(Self::new(endpoint, config.slack.clone())))
    }

    pub fn message<'a>(&'a self, text: &'a str) -> SlackMessage<'a> {
        SlackMessage {
            channel: &self.identity.channel,
            username: &self.identity.username,
            text,
            icon_emoji: &self.identity.icon_emoji,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&self.message(text))
            .send()
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "webhook answered {}: {}",
                status, body
            )));
        }

        debug!(text = %text, "Notification sent");
        Ok(())
    }
}
