//! Fans a single message out to the requested platforms.
//!
//! Target validation is all-or-nothing: if any requested platform is unknown
//! or not registered, no adapter is invoked. Once validation passes, each
//! platform is attempted independently and a failure on one never prevents
//! delivery to the others.

use crate::notifier::{ConnectionCheck, Notifier, NotifierError, Platform};
use crate::registry::PlatformRegistry;
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// A request-level rejection. No adapter has been invoked when one of these
/// is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("No platforms selected")]
    NoPlatformsSelected { available: Vec<Platform> },
    #[error("Invalid or disabled platforms: {invalid:?}")]
    InvalidPlatforms {
        invalid: Vec<String>,
        available: Vec<Platform>,
    },
}

impl DispatchError {
    /// Platforms the caller could have asked for instead.
    pub fn available_platforms(&self) -> Option<&[Platform]> {
        match self {
            DispatchError::EmptyMessage => None,
            DispatchError::NoPlatformsSelected { available }
            | DispatchError::InvalidPlatforms { available, .. } => Some(available),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            DispatchError::EmptyMessage => "empty_message",
            DispatchError::NoPlatformsSelected { .. } => "no_platforms",
            DispatchError::InvalidPlatforms { .. } => "invalid_platforms",
        }
    }
}

/// The outcome of one platform's send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    pub error: Option<String>,
}

impl DispatchResult {
    fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate view of a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// The message that was sent.
    pub message: String,
    /// Number of distinct platforms attempted.
    pub total_platforms: usize,
    /// Number of platforms that accepted the message.
    pub successful: usize,
    pub results: BTreeMap<Platform, DispatchResult>,
}

/// Whether a validated request reached at least one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// At least one platform accepted the message. Others may have failed.
    Delivered(DispatchReport),
    /// Every attempted platform failed.
    AllFailed(DispatchReport),
}

impl DispatchOutcome {
    pub fn report(&self) -> &DispatchReport {
        match self {
            DispatchOutcome::Delivered(report) | DispatchOutcome::AllFailed(report) => report,
        }
    }

    pub fn into_report(self) -> DispatchReport {
        match self {
            DispatchOutcome::Delivered(report) | DispatchOutcome::AllFailed(report) => report,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered(_))
    }
}

/// Validates notification requests and fans them out to registered adapters.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<PlatformRegistry>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<PlatformRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Sends `message` to `platforms`, or to every registered platform when
    /// `platforms` is `None`.
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn notify(
        &self,
        message: &str,
        platforms: Option<&[String]>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let targets = self.resolve_targets(message, platforms).inspect_err(|e| {
            warn!(error = %e, "Rejected notification request");
            metrics::counter!("notify_requests_rejected_total", "reason" => e.reason()).increment(1);
        })?;

        debug!(?targets, "Dispatching notification");

        let sends = targets.iter().map(|&platform| {
            // Targets were resolved against the registry above.
            let notifier = self.registry.get(platform).cloned();
            async move {
                let result = match notifier {
                    Some(notifier) => self.send_one(notifier, message).await,
                    None => DispatchResult::failed(format!("{platform} is not registered")),
                };
                (platform, result)
            }
        });
        let results: BTreeMap<Platform, DispatchResult> = join_all(sends).await.into_iter().collect();

        let successful = results.values().filter(|r| r.success).count();
        let report = DispatchReport {
            message: message.to_string(),
            total_platforms: targets.len(),
            successful,
            results,
        };

        if successful == 0 {
            error!(total = report.total_platforms, "Failed to send to any platform");
            Ok(DispatchOutcome::AllFailed(report))
        } else {
            info!(
                total = report.total_platforms,
                successful, "Notification dispatched"
            );
            Ok(DispatchOutcome::Delivered(report))
        }
    }

    /// Runs `test_connection` on every registered adapter concurrently.
    pub async fn test_connections(&self) -> BTreeMap<Platform, ConnectionCheck> {
        let checks = self.registry.iter().map(|(platform, notifier)| async move {
            let check = AssertUnwindSafe(notifier.test_connection())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| ConnectionCheck::failed("connection test panicked"));
            if !check.success {
                error!(%platform, error = ?check.error, "Connection test failed");
            }
            (platform, check)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Validates the request and returns the distinct target platforms in
    /// request order.
    fn resolve_targets(
        &self,
        message: &str,
        platforms: Option<&[String]>,
    ) -> Result<Vec<Platform>, DispatchError> {
        if message.is_empty() {
            return Err(DispatchError::EmptyMessage);
        }

        let Some(requested) = platforms else {
            return Ok(self.registry.platforms());
        };

        if requested.is_empty() {
            return Err(DispatchError::NoPlatformsSelected {
                available: self.registry.platforms(),
            });
        }

        let mut targets = Vec::with_capacity(requested.len());
        let mut invalid = Vec::new();
        for name in requested {
            match name.parse::<Platform>() {
                Ok(platform) if self.registry.contains(platform) => {
                    if !targets.contains(&platform) {
                        targets.push(platform);
                    }
                }
                _ => {
                    if !invalid.contains(name) {
                        invalid.push(name.clone());
                    }
                }
            }
        }

        if !invalid.is_empty() {
            return Err(DispatchError::InvalidPlatforms {
                invalid,
                available: self.registry.platforms(),
            });
        }
        Ok(targets)
    }

    /// Sends to one adapter, turning every fault into a failed result.
    async fn send_one(&self, notifier: Arc<dyn Notifier>, message: &str) -> DispatchResult {
        let platform = notifier.platform();
        let start = Instant::now();

        let send = AssertUnwindSafe(notifier.send_message(message)).catch_unwind();
        let result = match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(Ok(_receipt))) => DispatchResult::delivered(),
            Ok(Ok(Err(e))) => DispatchResult::failed(e),
            Ok(Err(_panic)) => DispatchResult::failed(format!("{platform} notifier panicked")),
            Err(_elapsed) => DispatchResult::failed(NotifierError::Timeout {
                platform,
                timeout: self.send_timeout,
            }),
        };

        let outcome = if result.success { "success" } else { "failure" };
        metrics::counter!(
            "notifications_sent_total",
            "platform" => platform.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!(
            "notification_send_duration_seconds",
            "platform" => platform.as_str()
        )
        .record(start.elapsed().as_secs_f64());

        if let Some(error) = &result.error {
            error!(%platform, %error, "Failed to send notification");
        }
        result
    }
}
