#![allow(dead_code)]
pub mod api;
pub mod mock_notifier;
pub mod test_metrics;

use lan_notifier::{Dispatcher, Notifier, PlatformRegistry};
use mock_notifier::MockNotifier;
use std::sync::Arc;
use std::time::Duration;

/// Builds a registry from a set of mocks.
pub fn registry_of(mocks: &[Arc<MockNotifier>]) -> Arc<PlatformRegistry> {
    let notifiers = mocks.iter().map(|m| m.clone() as Arc<dyn Notifier>);
    Arc::new(PlatformRegistry::from_notifiers(notifiers).expect("at least one mock"))
}

/// Builds a dispatcher over a set of mocks with a generous send timeout.
pub fn dispatcher_of(mocks: &[Arc<MockNotifier>]) -> Dispatcher {
    Dispatcher::new(registry_of(mocks), Duration::from_secs(5))
}
