//! LAN Notifier - a centralized notification relay
//!
//! This library accepts a single notification request and fans it out to
//! the configured messaging backends (Slack, Telegram and WhatsApp via
//! Twilio), reporting a per-platform outcome for every target.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod internal_metrics;
pub mod notifier;
pub mod registry;
pub mod server;

// Re-export the types most callers need.
pub use dispatch::{DispatchError, DispatchOutcome, DispatchReport, DispatchResult, Dispatcher};
pub use notifier::{ConnectionCheck, Notifier, NotifierError, Platform};
pub use registry::{PlatformRegistry, RegistryError};
