//! # API Server
//!
//! Exposes the dispatcher over HTTP with `axum`:
//!
//! - `GET /health` reports the registered platforms.
//! - `GET /test` checks every platform's credentials.
//! - `POST /notify` fans a message out.
//! - `GET /metrics` renders Prometheus metrics, when enabled.
//!
//! The server shuts down gracefully when the main application signals it.

pub mod error;
pub mod handlers;

use crate::dispatch::Dispatcher;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/test", get(handlers::test_connections))
        .route("/notify", post(handlers::notify));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.fallback(handlers::not_found).with_state(state)
}

/// The HTTP server for the notification API.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl ApiServer {
    /// Creates a new `ApiServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `state` - The state shared with every handler.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router: router(state),
            shutdown_rx,
        }
    }

    /// Returns a future that serves requests until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let mut shutdown_rx = self.shutdown_rx;
        let listener = self.listener;
        let router = self.router;

        async move {
            if let Ok(addr) = listener.local_addr() {
                info!(%addr, "API server listening");
            }

            let shutdown = async move {
                // An error means every sender is gone, which is a shutdown too.
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
                trace!("API server received shutdown signal.");
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("API server error: {}", e);
            }
            trace!("API server task finished.");
        }
    }
}
