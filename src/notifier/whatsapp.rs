//! A client for sending WhatsApp messages through the Twilio REST API.

use super::{
    api_base, build_client, required, ConfigError, ConnectionCheck, Notifier, NotifierError,
    Platform, SendReceipt,
};
use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

const CHANNEL_PREFIX: &str = "whatsapp:";

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioAccount {
    friendly_name: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: Option<String>,
}

/// Prepends the WhatsApp channel scheme when the address lacks it.
pub fn with_channel_prefix(number: &str) -> String {
    if number.starts_with(CHANNEL_PREFIX) {
        number.to_string()
    } else {
        format!("{CHANNEL_PREFIX}{number}")
    }
}

/// Sends WhatsApp messages from a Twilio sender to a fixed recipient.
pub struct WhatsAppNotifier {
    config: WhatsAppConfig,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl WhatsAppNotifier {
    pub fn new(config: WhatsAppConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            client: None,
        }
    }

    pub fn from_number(&self) -> Option<&str> {
        self.config.from_number.as_deref()
    }

    pub fn to_number(&self) -> Option<&str> {
        self.config.to_number.as_deref()
    }

    fn account_sid(&self) -> &str {
        self.config.account_sid.as_deref().unwrap_or_default()
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, NotifierError> {
        let res = request
            .basic_auth(self.account_sid(), self.config.auth_token.as_deref())
            .send()
            .await
            .map_err(|e| NotifierError::http(Platform::WhatsApp, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioError>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(NotifierError::Api {
                platform: Platform::WhatsApp,
                status: Some(status.as_u16()),
                message,
            });
        }

        res.json()
            .await
            .map_err(|e| NotifierError::http(Platform::WhatsApp, e))
    }

    fn client(&self) -> Result<&reqwest::Client, NotifierError> {
        self.client
            .as_ref()
            .ok_or(NotifierError::NotInitialized(Platform::WhatsApp))
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    fn platform(&self) -> Platform {
        Platform::WhatsApp
    }

    fn validate_config(&mut self) -> Result<(), ConfigError> {
        let p = Platform::WhatsApp;
        let account_sid = required(p, "account_sid", self.config.account_sid.as_deref())?.to_string();
        let auth_token = required(p, "auth_token", self.config.auth_token.as_deref())?.to_string();
        let from_number = required(p, "from_number", self.config.from_number.as_deref())?;
        let from_number = with_channel_prefix(from_number);
        let to_number = required(p, "to_number", self.config.to_number.as_deref())?;
        let to_number = with_channel_prefix(to_number);

        self.config.account_sid = Some(account_sid);
        self.config.auth_token = Some(auth_token);
        self.config.from_number = Some(from_number);
        self.config.to_number = Some(to_number);

        self.config.api_base = api_base(p, &self.config.api_base)?;
        self.client = Some(build_client(p, self.timeout)?);
        Ok(())
    }

    #[instrument(skip(self, text), fields(to = self.to_number().unwrap_or_default()))]
    async fn send_message(&self, text: &str) -> Result<SendReceipt, NotifierError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base,
            self.account_sid()
        );
        let form = [
            ("Body", text),
            ("From", self.from_number().unwrap_or_default()),
            ("To", self.to_number().unwrap_or_default()),
        ];

        let request = self.client()?.post(url).form(&form);
        match self.execute::<TwilioMessage>(request).await {
            Ok(message) => {
                info!(
                    sid = %message.sid,
                    status = message.status.as_deref().unwrap_or("unknown"),
                    "Message sent to WhatsApp {}",
                    self.to_number().unwrap_or_default()
                );
                Ok(SendReceipt {
                    id: Some(message.sid),
                })
            }
            Err(e) => {
                debug!(error = %e, "Error sending message to WhatsApp");
                Err(e)
            }
        }
    }

    async fn test_connection(&self) -> ConnectionCheck {
        let url = format!(
            "{}/2010-04-01/Accounts/{}.json",
            self.config.api_base,
            self.account_sid()
        );
        let request = match self.client() {
            Ok(client) => client.get(url),
            Err(e) => return ConnectionCheck::failed(e),
        };

        match self.execute::<TwilioAccount>(request).await {
            Ok(account) => {
                info!(
                    account = account.friendly_name.as_deref().unwrap_or_default(),
                    status = account.status.as_deref().unwrap_or_default(),
                    "Twilio connection OK"
                );
                ConnectionCheck::ok()
            }
            Err(e) => {
                debug!(error = %e, "Twilio connection failed");
                ConnectionCheck::failed(e)
            }
        }
    }
}
