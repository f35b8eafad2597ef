//! A client for sending notifications through a Telegram bot.

use super::{
    api_base, build_client, required, ConfigError, ConnectionCheck, Notifier, NotifierError,
    Platform, SendReceipt,
};
use crate::config::TelegramConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// The Bot API response envelope.
#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

/// Sends messages to a single chat through the Telegram Bot API.
pub struct TelegramNotifier {
    config: TelegramConfig,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            client: None,
        }
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.config.chat_id.as_deref()
    }

    /// Invokes a bot method. The token is part of the URL, so it is kept out
    /// of every error this returns.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, NotifierError> {
        let client = self
            .client
            .as_ref()
            .ok_or(NotifierError::NotInitialized(Platform::Telegram))?;
        let token = self.config.token.as_deref().unwrap_or_default();
        let url = format!("{}/bot{}/{}", self.config.api_base, token, method);

        let request = match body {
            Some(body) => client.post(url).json(&body),
            None => client.get(url),
        };
        let res = request
            .send()
            .await
            .map_err(|e| NotifierError::http(Platform::Telegram, e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| NotifierError::http(Platform::Telegram, e))?;

        let parsed: BotResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(NotifierError::Api {
                    platform: Platform::Telegram,
                    status: Some(status.as_u16()),
                    message: text,
                })
            }
        };

        match parsed {
            BotResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            BotResponse { description, .. } => Err(NotifierError::Api {
                platform: Platform::Telegram,
                status: (!status.is_success()).then(|| status.as_u16()),
                message: description.unwrap_or_else(|| "request was not accepted".to_string()),
            }),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    fn validate_config(&mut self) -> Result<(), ConfigError> {
        let token = required(Platform::Telegram, "token", self.config.token.as_deref())?.to_string();
        let chat_id =
            required(Platform::Telegram, "chat_id", self.config.chat_id.as_deref())?.to_string();
        self.config.token = Some(token);
        self.config.chat_id = Some(chat_id);

        self.config.api_base = api_base(Platform::Telegram, &self.config.api_base)?;
        self.client = Some(build_client(Platform::Telegram, self.timeout)?);
        Ok(())
    }

    #[instrument(skip(self, text), fields(chat_id = self.chat_id().unwrap_or_default()))]
    async fn send_message(&self, text: &str) -> Result<SendReceipt, NotifierError> {
        let payload = json!({ "chat_id": self.chat_id(), "text": text });
        match self.call::<SentMessage>("sendMessage", Some(payload)).await {
            Ok(message) => {
                info!(
                    message_id = message.message_id,
                    "Message sent to Telegram chat {}",
                    self.chat_id().unwrap_or_default()
                );
                Ok(SendReceipt {
                    id: Some(message.message_id.to_string()),
                })
            }
            Err(e) => {
                debug!(error = %e, "Error sending message to Telegram");
                Err(e)
            }
        }
    }

    async fn test_connection(&self) -> ConnectionCheck {
        match self.call::<BotUser>("getMe", None).await {
            Ok(me) => {
                info!(
                    "Telegram connection OK - Bot: @{}",
                    me.username.as_deref().unwrap_or("unknown")
                );
                ConnectionCheck::ok()
            }
            Err(e) => {
                debug!(error = %e, "Telegram connection failed");
                ConnectionCheck::failed(e)
            }
        }
    }
}
