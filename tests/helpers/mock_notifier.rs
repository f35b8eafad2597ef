#![allow(dead_code)]
//! A scripted notifier for exercising the dispatcher without network access.

use async_trait::async_trait;
use lan_notifier::notifier::{
    ConfigError, ConnectionCheck, Notifier, NotifierError, Platform, SendReceipt,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::Barrier;

/// What the mock does when asked to send.
#[derive(Clone, Debug)]
pub enum Behavior {
    Succeed,
    Fail(String),
    Panic,
    Hang,
}

/// A mock Notifier that records every call it receives.
#[derive(Debug)]
pub struct MockNotifier {
    platform: Platform,
    behavior: Behavior,
    barrier: Option<Arc<Barrier>>,
    sends: AtomicUsize,
    in_flight: AtomicUsize,
    connection_tests: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            behavior: Behavior::Succeed,
            barrier: None,
            sends: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            connection_tests: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, error: &str) -> Self {
        self.behavior = Behavior::Fail(error.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behavior = Behavior::Panic;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.behavior = Behavior::Hang;
        self
    }

    /// Makes every send wait on `barrier` before completing, so a send can
    /// only finish once all parties are in flight at the same time.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Sends that have started but neither finished nor been dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn connection_test_count(&self) -> usize {
        self.connection_tests.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

/// Counts a send as in flight until it is dropped, whether it completed or
/// was abandoned mid-await.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn validate_config(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<SendReceipt, NotifierError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(text.to_string());
        let _in_flight = InFlight::enter(&self.in_flight);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        match &self.behavior {
            Behavior::Succeed => Ok(SendReceipt {
                id: Some(format!("{}-1", self.platform)),
            }),
            Behavior::Fail(message) => Err(NotifierError::Api {
                platform: self.platform,
                status: None,
                message: message.clone(),
            }),
            Behavior::Panic => panic!("{} exploded", self.platform),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SendReceipt::default())
            }
        }
    }

    async fn test_connection(&self) -> ConnectionCheck {
        self.connection_tests.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Fail(message) => ConnectionCheck::failed(message),
            _ => ConnectionCheck::ok(),
        }
    }
}
