//! LAN Notifier - centralized notification relay
//!
//! Accepts notification requests over HTTP and delivers them to Slack,
//! Telegram and WhatsApp.

use anyhow::{bail, Result};
use clap::Parser;
use lan_notifier::{
    cli::Cli,
    config::Config,
    dispatch::Dispatcher,
    internal_metrics,
    registry::PlatformRegistry,
    server::{ApiServer, AppState},
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::watch};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("info");
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    let level = if config.server.debug {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    init_tracing(level);

    info!("LAN Notifier starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Bind Address: {}:{}", config.server.host, config.server.port);
    info!("Debug: {}", config.server.debug);
    info!("Log Level: {}", level);
    info!("Delivery Timeout: {}s", config.delivery.timeout_seconds);
    info!("Metrics: {}", enabled(config.metrics.enabled));
    info!("Slack: {}", enabled(config.slack.is_enabled()));
    info!("Telegram: {}", enabled(config.telegram.is_enabled()));
    info!("WhatsApp: {}", enabled(config.whatsapp.is_enabled()));
    info!("-------------------------------------------------------");

    if let Err(e) = config.validate() {
        error!("Failed to initialize application: {}", e);
        return Err(e);
    }

    let registry = match PlatformRegistry::initialize(&config) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            return Err(e.into());
        }
    };
    info!(platforms = ?registry.platforms(), "Application started with platforms");

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        Duration::from_secs(config.delivery.timeout_seconds),
    ));

    let mut state = AppState::new(dispatcher);
    if config.metrics.enabled {
        state = state.with_metrics(internal_metrics::install_recorder()?);
        info!("Prometheus metrics available at /metrics");
    }

    let shutdown = shutdown_signal()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let mut server_task = tokio::spawn(ApiServer::new(listener, state, shutdown_rx).run());

    tokio::select! {
        result = &mut server_task => {
            if let Err(e) = result {
                error!("API server task panicked: {:?}", e);
            }
            bail!("API server stopped unexpectedly");
        }
        _ = shutdown => {
            info!("Shutdown signal received. Shutting down gracefully...");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = server_task.await {
        error!("API server task panicked: {:?}", e);
    }

    info!("Shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where supported. The SIGTERM handler is
/// registered before this returns.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
    })
}
