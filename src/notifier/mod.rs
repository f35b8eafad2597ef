//! Platform adapters and the contract they share.
//!
//! Every messaging backend the relay can deliver to is wrapped in a type that
//! implements [`Notifier`]. The dispatcher only ever talks to adapters through
//! this trait, so a backend can be swapped for a test double without touching
//! the fan-out logic.

pub mod slack;
pub mod telegram;
pub mod whatsapp;

pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;
pub use whatsapp::WhatsAppNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// The closed set of messaging backends the relay knows how to reach.
///
/// The declaration order is the canonical order used for default target
/// lists and for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Team chat via the Slack Web API.
    Slack,
    /// Bot messaging via the Telegram Bot API.
    Telegram,
    /// WhatsApp delivered through the Twilio messaging gateway.
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Platform {
    /// All platforms, in canonical order.
    pub const ALL: [Platform; 3] = [Platform::Slack, Platform::Telegram, Platform::WhatsApp];

    /// The identifier used on the wire and in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Slack => "slack",
            Platform::Telegram => "telegram",
            Platform::WhatsApp => "whatsapp",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Raised while an adapter checks and normalizes its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{platform} {field} is required")]
    MissingField {
        platform: Platform,
        field: &'static str,
    },
    #[error("{platform} {field} is invalid: {reason}")]
    InvalidField {
        platform: Platform,
        field: &'static str,
        reason: String,
    },
    #[error("failed to build {platform} HTTP client: {source}")]
    Client {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },
}

/// Raised when a vendor call fails. Carries enough detail to be shown to the
/// caller as the per-platform error string.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("{0} client not initialized")]
    NotInitialized(Platform),
    #[error("{platform} request failed: {source}")]
    Http {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },
    #[error("{platform} API error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Api {
        platform: Platform,
        status: Option<u16>,
        message: String,
    },
    #[error("{platform} request timed out after {timeout:?}")]
    Timeout { platform: Platform, timeout: Duration },
}

impl NotifierError {
    pub(crate) fn http(platform: Platform, source: reqwest::Error) -> Self {
        // reqwest embeds the full request URL in its error text; for Telegram
        // that URL contains the bot token.
        NotifierError::Http {
            platform,
            source: source.without_url(),
        }
    }
}

/// Acknowledgement returned by a vendor that accepted a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Vendor-side identifier of the created message, when one is returned.
    pub id: Option<String>,
}

/// Outcome of a credential check against a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub error: Option<String>,
}

impl ConnectionCheck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// The capability contract every platform adapter satisfies.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The platform this adapter delivers to.
    fn platform(&self) -> Platform;

    /// Checks required fields, normalizes destinations and builds the live
    /// client handle. Must succeed before the adapter is registered.
    fn validate_config(&mut self) -> Result<(), ConfigError>;

    /// Sends `text` to the configured destination.
    ///
    /// # Returns
    /// * `Ok(SendReceipt)` once the vendor has accepted the message
    /// * `Err` on rejection, authentication failure or network fault
    async fn send_message(&self, text: &str) -> Result<SendReceipt, NotifierError>;

    /// Performs a read-only call to confirm the credentials are usable.
    /// Faults are reported in the returned value, never raised.
    async fn test_connection(&self) -> ConnectionCheck;
}

/// Builds the HTTP client an adapter uses for every vendor call.
pub(crate) fn build_client(platform: Platform, timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lan-notifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| ConfigError::Client { platform, source })
}

/// Returns the trimmed value of a required field.
pub(crate) fn required<'a>(
    platform: Platform,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { platform, field }),
    }
}

/// Parses an API base URL, dropping any trailing slash.
pub(crate) fn api_base(platform: Platform, raw: &str) -> Result<String, ConfigError> {
    reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidField {
        platform,
        field: "api_base",
        reason: e.to_string(),
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}
