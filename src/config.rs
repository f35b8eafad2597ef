//! Configuration management for the notifier
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an optional TOML file, environment variables and
//! command-line arguments, in that order.

use crate::cli::Cli;
use crate::notifier::Platform;
use anyhow::{bail, Result};
use figment::{
    providers::{Format, Serialized, Toml},
    value::{Dict, Map, Value},
    Error, Figment, Metadata, Profile, Provider,
};
use serde::{Deserialize, Deserializer, Serialize};

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// HTTP listener and logging settings.
    pub server: ServerConfig,
    /// Limits applied to outbound vendor calls.
    pub delivery: DeliveryConfig,
    /// Prometheus metrics settings.
    pub metrics: MetricsConfig,
    /// Slack credentials and destination.
    pub slack: SlackConfig,
    /// Telegram bot credentials and destination.
    pub telegram: TelegramConfig,
    /// Twilio credentials and WhatsApp numbers.
    pub whatsapp: WhatsAppConfig,
}

/// HTTP listener and logging settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Enables debug logging.
    pub debug: bool,
    /// The logging level used when `debug` is off and `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeliveryConfig {
    /// Upper bound, in seconds, for a single vendor call.
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MetricsConfig {
    /// Installs the Prometheus recorder and serves `/metrics`.
    pub enabled: bool,
}

/// Slack configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SlackConfig {
    /// Bot or user OAuth token.
    pub token: Option<String>,
    /// Channel that receives messages.
    pub channel: String,
    /// Base URL of the Slack Web API.
    pub api_base: String,
}

/// Telegram configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: Option<String>,
    /// Chat or channel identifier that receives messages. Numeric ids may be
    /// written as TOML integers.
    #[serde(default, deserialize_with = "string_or_integer")]
    pub chat_id: Option<String>,
    /// Base URL of the Bot API.
    pub api_base: String,
}

/// WhatsApp (Twilio) configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WhatsAppConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Twilio sender number.
    pub from_number: Option<String>,
    /// Recipient number.
    pub to_number: Option<String>,
    /// Base URL of the Twilio REST API.
    pub api_base: String,
}

/// Accepts an identifier written either as a string or as an integer.
fn string_or_integer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Integer(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Integer(n) => n.to_string(),
    }))
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl SlackConfig {
    pub fn is_enabled(&self) -> bool {
        present(&self.token)
    }
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        present(&self.token) && present(&self.chat_id)
    }
}

impl WhatsAppConfig {
    pub fn is_enabled(&self) -> bool {
        present(&self.account_sid)
            && present(&self.auth_token)
            && present(&self.from_number)
            && present(&self.to_number)
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are merged from lowest to highest precedence: built-in
    /// defaults, the TOML file given with `--config`, environment variables
    /// and finally explicit command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            .merge(EnvVars)
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }

    /// Platforms whose required fields are all present, in canonical order.
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| match platform {
                Platform::Slack => self.slack.is_enabled(),
                Platform::Telegram => self.telegram.is_enabled(),
                Platform::WhatsApp => self.whatsapp.is_enabled(),
            })
            .collect()
    }

    /// Fails when no platform has credentials configured or when a setting
    /// would make every delivery fail.
    pub fn validate(&self) -> Result<()> {
        if self.delivery.timeout_seconds == 0 {
            bail!("delivery.timeout_seconds must be greater than 0");
        }
        if self.enabled_platforms().is_empty() {
            bail!(
                "No notification platforms configured. \
                 Please set at least one platform's credentials."
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                debug: false,
                log_level: "info".to_string(),
            },
            delivery: DeliveryConfig { timeout_seconds: 10 },
            metrics: MetricsConfig::default(),
            slack: SlackConfig {
                token: None,
                channel: "#general".to_string(),
                api_base: "https://slack.com/api".to_string(),
            },
            telegram: TelegramConfig {
                token: None,
                chat_id: None,
                api_base: "https://api.telegram.org".to_string(),
            },
            whatsapp: WhatsAppConfig {
                account_sid: None,
                auth_token: None,
                from_number: None,
                to_number: None,
                api_base: "https://api.twilio.com".to_string(),
            },
        }
    }
}

/// How a raw environment value is turned into a config value.
#[derive(Clone, Copy)]
enum Kind {
    Text,
    Flag,
    Port,
    Seconds,
}

/// Environment variable, target section, target key.
const ENV_KEYS: &[(&str, &str, &str, Kind)] = &[
    ("DEBUG", "server", "debug", Kind::Flag),
    ("HOST", "server", "host", Kind::Text),
    ("PORT", "server", "port", Kind::Port),
    ("LOG_LEVEL", "server", "log_level", Kind::Text),
    ("DELIVERY_TIMEOUT_SECONDS", "delivery", "timeout_seconds", Kind::Seconds),
    ("METRICS_ENABLED", "metrics", "enabled", Kind::Flag),
    ("SLACK_TOKEN", "slack", "token", Kind::Text),
    ("SLACK_CHANNEL", "slack", "channel", Kind::Text),
    ("TELEGRAM_TOKEN", "telegram", "token", Kind::Text),
    ("TELEGRAM_CHAT_ID", "telegram", "chat_id", Kind::Text),
    ("TWILIO_ACCOUNT_SID", "whatsapp", "account_sid", Kind::Text),
    ("TWILIO_AUTH_TOKEN", "whatsapp", "auth_token", Kind::Text),
    ("TWILIO_FROM_NUMBER", "whatsapp", "from_number", Kind::Text),
    ("WHATSAPP_TO_NUMBER", "whatsapp", "to_number", Kind::Text),
];

/// Reads the well-known environment variables as plain strings.
///
/// `figment::providers::Env` parses values, which would turn a number like
/// `+14155238886` into an integer and drop the sign.
struct EnvVars;

impl Provider for EnvVars {
    fn metadata(&self) -> Metadata {
        Metadata::named("Environment Variables")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut sections: Map<&str, Dict> = Map::new();

        for &(var, section, key, kind) in ENV_KEYS {
            let Ok(raw) = std::env::var(var) else {
                continue;
            };
            let value = match kind {
                Kind::Text => Value::from(raw),
                Kind::Flag => Value::from(raw.trim().eq_ignore_ascii_case("true")),
                Kind::Port => Value::from(u64::from(
                    raw.trim()
                        .parse::<u16>()
                        .map_err(|e| Error::from(format!("invalid {var} '{raw}': {e}")))?,
                )),
                Kind::Seconds => Value::from(
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|e| Error::from(format!("invalid {var} '{raw}': {e}")))?,
                ),
            };
            sections.entry(section).or_default().insert(key.to_string(), value);
        }

        let dict = sections
            .into_iter()
            .map(|(section, values)| (section.to_string(), Value::from(values)))
            .collect();

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_nothing() {
        let config = Config::default();
        assert!(config.enabled_platforms().is_empty());
        assert!(config.validate().is_err());
        assert_eq!(config.slack.channel, "#general");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn empty_strings_do_not_enable_a_platform() {
        let mut config = Config::default();
        config.telegram.token = Some("token".to_string());
        config.telegram.chat_id = Some(String::new());
        assert!(!config.telegram.is_enabled());

        config.telegram.chat_id = Some("42".to_string());
        assert!(config.telegram.is_enabled());
        assert_eq!(config.enabled_platforms(), vec![Platform::Telegram]);
    }

    #[test]
    fn whatsapp_needs_all_four_fields() {
        let mut config = Config::default();
        config.whatsapp.account_sid = Some("AC1".to_string());
        config.whatsapp.auth_token = Some("secret".to_string());
        config.whatsapp.from_number = Some("+1".to_string());
        assert!(!config.whatsapp.is_enabled());

        config.whatsapp.to_number = Some("+2".to_string());
        assert!(config.whatsapp.is_enabled());
    }

    #[test]
    fn enabled_platforms_follow_canonical_order() {
        let mut config = Config::default();
        config.whatsapp.account_sid = Some("AC1".to_string());
        config.whatsapp.auth_token = Some("secret".to_string());
        config.whatsapp.from_number = Some("+1".to_string());
        config.whatsapp.to_number = Some("+2".to_string());
        config.slack.token = Some("xoxb".to_string());

        assert_eq!(
            config.enabled_platforms(),
            vec![Platform::Slack, Platform::WhatsApp]
        );
        assert!(config.validate().is_ok());
    }
}
