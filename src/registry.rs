//! The set of platform adapters available to the process.
//!
//! The registry is built once at startup and never mutated afterwards, so it
//! is shared behind an `Arc` without any locking.

use crate::config::Config;
use crate::notifier::{
    Notifier, Platform, SlackNotifier, TelegramNotifier, WhatsAppNotifier,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error(
        "No notification platforms configured. Please set at least one platform's credentials."
    )]
    NoPlatformsConfigured,
}

/// Maps each platform to its initialized adapter.
pub struct PlatformRegistry {
    notifiers: BTreeMap<Platform, Arc<dyn Notifier>>,
}

impl std::fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

impl PlatformRegistry {
    /// Builds an adapter for every enabled platform in `config`.
    ///
    /// A platform whose adapter rejects its configuration is logged and left
    /// out. Only an empty result is an error.
    pub fn initialize(config: &Config) -> Result<Self, RegistryError> {
        let timeout = Duration::from_secs(config.delivery.timeout_seconds);
        let mut candidates: Vec<Box<dyn Notifier>> = Vec::new();

        for platform in Platform::ALL {
            let candidate: Option<Box<dyn Notifier>> = match platform {
                Platform::Slack if config.slack.is_enabled() => {
                    Some(Box::new(SlackNotifier::new(config.slack.clone(), timeout)))
                }
                Platform::Telegram if config.telegram.is_enabled() => {
                    Some(Box::new(TelegramNotifier::new(config.telegram.clone(), timeout)))
                }
                Platform::WhatsApp if config.whatsapp.is_enabled() => {
                    Some(Box::new(WhatsAppNotifier::new(config.whatsapp.clone(), timeout)))
                }
                _ => None,
            };

            match candidate {
                Some(notifier) => candidates.push(notifier),
                None => debug!(%platform, "Platform not configured, skipping"),
            }
        }

        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
        for mut notifier in candidates {
            let platform = notifier.platform();
            match notifier.validate_config() {
                Ok(()) => {
                    info!(%platform, "Notifier initialized");
                    notifiers.push(Arc::from(notifier));
                }
                Err(e) => {
                    error!(%platform, error = %e, "Failed to initialize notifier");
                }
            }
        }

        Self::from_notifiers(notifiers)
    }

    /// Builds a registry from adapters that have already been validated.
    ///
    /// When two adapters report the same platform, the last one wins.
    pub fn from_notifiers(
        notifiers: impl IntoIterator<Item = Arc<dyn Notifier>>,
    ) -> Result<Self, RegistryError> {
        let notifiers: BTreeMap<_, _> = notifiers
            .into_iter()
            .map(|notifier| (notifier.platform(), notifier))
            .collect();

        if notifiers.is_empty() {
            return Err(RegistryError::NoPlatformsConfigured);
        }
        Ok(Self { notifiers })
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn Notifier>> {
        self.notifiers.get(&platform)
    }

    /// Looks up an adapter by its wire name; unknown names resolve to `None`.
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<dyn Notifier>> {
        name.parse::<Platform>().ok().and_then(|p| self.get(p))
    }

    /// Registered platforms, in canonical order.
    pub fn platforms(&self) -> Vec<Platform> {
        self.notifiers.keys().copied().collect()
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.notifiers.contains_key(&platform)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &Arc<dyn Notifier>)> {
        self.notifiers.iter().map(|(p, n)| (*p, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telegram_only() -> Config {
        let mut config = Config::default();
        config.telegram.token = Some("123:abc".to_string());
        config.telegram.chat_id = Some("42".to_string());
        config
    }

    #[test]
    fn initialize_registers_enabled_platforms() {
        let registry = PlatformRegistry::initialize(&telegram_only()).unwrap();
        assert_eq!(registry.platforms(), vec![Platform::Telegram]);
        assert!(registry.get(Platform::Slack).is_none());
        assert!(registry.get_by_name("telegram").is_some());
        assert!(registry.get_by_name("sms").is_none());
    }

    #[test]
    fn initialize_without_credentials_is_fatal() {
        let err = PlatformRegistry::initialize(&Config::default()).unwrap_err();
        assert_eq!(err, RegistryError::NoPlatformsConfigured);
    }

    #[test]
    fn initialize_skips_platforms_that_fail_validation() {
        let mut config = telegram_only();
        // Non-empty, so the platform counts as enabled, but the adapter
        // rejects a token made only of whitespace.
        config.slack.token = Some("   ".to_string());
        config.slack.api_base = "https://slack.com/api".to_string();

        let registry = PlatformRegistry::initialize(&config).unwrap();
        assert_eq!(registry.platforms(), vec![Platform::Telegram]);
    }

    #[test]
    fn initialize_fails_when_every_enabled_platform_is_rejected() {
        let mut config = Config::default();
        config.slack.token = Some("xoxb".to_string());
        config.slack.api_base = "::not a url::".to_string();

        let err = PlatformRegistry::initialize(&config).unwrap_err();
        assert_eq!(err, RegistryError::NoPlatformsConfigured);
    }

    #[test]
    fn platforms_are_listed_in_canonical_order() {
        let mut config = telegram_only();
        config.whatsapp.account_sid = Some("AC1".to_string());
        config.whatsapp.auth_token = Some("secret".to_string());
        config.whatsapp.from_number = Some("+1".to_string());
        config.whatsapp.to_number = Some("+2".to_string());
        config.slack.token = Some("xoxb".to_string());

        let registry = PlatformRegistry::initialize(&config).unwrap();
        assert_eq!(
            registry.platforms(),
            vec![Platform::Slack, Platform::Telegram, Platform::WhatsApp]
        );
        assert_eq!(registry.len(), 3);
    }
}
