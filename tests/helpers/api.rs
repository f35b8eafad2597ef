#![allow(dead_code)]
//! Test helpers for running the HTTP API on an ephemeral port.

use lan_notifier::server::{ApiServer, AppState};
use lan_notifier::Dispatcher;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A running API server bound to localhost.
pub struct TestApi {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TestApi {
    pub async fn start(dispatcher: Dispatcher) -> Self {
        Self::start_with_state(AppState::new(Arc::new(dispatcher))).await
    }

    /// Starts the server with `/metrics` rendered from `handle`.
    pub async fn start_with_metrics(dispatcher: Dispatcher, handle: PrometheusHandle) -> Self {
        Self::start_with_state(AppState::new(Arc::new(dispatcher)).with_metrics(handle)).await
    }

    async fn start_with_state(state: AppState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(ApiServer::new(listener, state, shutdown_rx).run());

        Self {
            addr,
            client: reqwest::Client::new(),
            shutdown_tx,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signals the server to stop and waits for it to exit.
    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).expect("Failed to send shutdown signal");
        tokio::time::timeout(std::time::Duration::from_secs(5), self.handle)
            .await
            .expect("API server did not shut down in time")
            .expect("API server task panicked");
    }
}
