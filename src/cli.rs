//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged on top
//! of the configuration file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Relays a single notification request to Slack, Telegram and WhatsApp.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the HTTP server to.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut server = Dict::new();

        if let Some(host) = &self.host {
            server.insert("host".into(), Value::from(host.clone()));
        }

        if let Some(port) = self.port {
            server.insert("port".into(), Value::from(u64::from(port)));
        }

        // A bare `--debug` can only turn debug on; leaving it off defers to
        // the lower layers.
        if self.debug {
            server.insert("debug".into(), Value::from(true));
        }

        if let Some(level) = &self.log_level {
            server.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut dict = Dict::new();
        if !server.is_empty() {
            dict.insert("server".into(), Value::from(server));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
