//! A client for sending notifications to Slack.

use super::{
    api_base, build_client, required, ConfigError, ConnectionCheck, Notifier, NotifierError,
    Platform, SendReceipt,
};
use crate::config::SlackConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_CHANNEL: &str = "#general";

/// The common envelope of every Slack Web API response.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
    team: Option<String>,
    user: Option<String>,
}

/// Posts messages to a Slack channel through the Web API.
pub struct SlackNotifier {
    config: SlackConfig,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl SlackNotifier {
    /// Creates a new `SlackNotifier`. No client exists until
    /// [`Notifier::validate_config`] succeeds.
    pub fn new(config: SlackConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            client: None,
        }
    }

    /// The channel messages are posted to.
    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    /// Calls a Web API method and unwraps Slack's `ok` envelope.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<SlackResponse, NotifierError> {
        let client = self
            .client
            .as_ref()
            .ok_or(NotifierError::NotInitialized(Platform::Slack))?;
        let token = self.config.token.as_deref().unwrap_or_default();

        let res = client
            .post(format!("{}/{}", self.config.api_base, method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifierError::http(Platform::Slack, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(NotifierError::Api {
                platform: Platform::Slack,
                status: Some(status.as_u16()),
                message: text,
            });
        }

        let parsed: SlackResponse = res
            .json()
            .await
            .map_err(|e| NotifierError::http(Platform::Slack, e))?;
        if !parsed.ok {
            return Err(NotifierError::Api {
                platform: Platform::Slack,
                status: None,
                message: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn platform(&self) -> Platform {
        Platform::Slack
    }

    fn validate_config(&mut self) -> Result<(), ConfigError> {
        let token = required(Platform::Slack, "token", self.config.token.as_deref())?.to_string();
        self.config.token = Some(token);

        if self.config.channel.trim().is_empty() {
            self.config.channel = DEFAULT_CHANNEL.to_string();
        }

        self.config.api_base = api_base(Platform::Slack, &self.config.api_base)?;
        self.client = Some(build_client(Platform::Slack, self.timeout)?);
        Ok(())
    }

    #[instrument(skip(self, text), fields(channel = %self.config.channel))]
    async fn send_message(&self, text: &str) -> Result<SendReceipt, NotifierError> {
        let payload = json!({ "channel": self.config.channel, "text": text });
        match self.call("chat.postMessage", payload).await {
            Ok(res) => {
                info!(ts = ?res.ts, "Message sent to Slack channel {}", self.config.channel);
                Ok(SendReceipt { id: res.ts })
            }
            Err(e) => {
                debug!(error = %e, "Error sending message to Slack");
                Err(e)
            }
        }
    }

    async fn test_connection(&self) -> ConnectionCheck {
        match self.call("auth.test", json!({})).await {
            Ok(res) => {
                info!(
                    team = res.team.as_deref().unwrap_or_default(),
                    user = res.user.as_deref().unwrap_or_default(),
                    "Slack connection OK"
                );
                ConnectionCheck::ok()
            }
            Err(e) => {
                debug!(error = %e, "Slack connection failed");
                ConnectionCheck::failed(e)
            }
        }
    }
}
