//! magicproxy CLI - run the proxy, issue tokens, inspect tokens.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use magicproxy_config::Config;
use magicproxy_telemetry::{LogConfig, setup_logging};

mod commands;

use commands::{inspect, issue, serve};

/// magicproxy - capability-scoped GitHub API proxy
#[derive(Parser)]
#[command(name = "magicproxy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "MAGICPROXY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Debug mode: verbose logging
        #[arg(short, long)]
        debug: bool,
    },

    /// Sign a new token (needs the private key)
    Issue {
        /// Scope in canonical form, e.g. "GET,HEAD /repos/*/*"
        #[arg(short, long)]
        scope: String,

        /// Lifetime: seconds, or a number with s, m, h or d
        #[arg(short, long, default_value = "1h")]
        ttl: String,
    },

    /// Decode and verify a token
    Inspect {
        /// Token in wire form
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Commands::Serve { host, port, debug } = &cli.command {
        if let Some(host) = host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        config.server.debug |= *debug;
        config.validate().context("invalid command-line override")?;
    }

    // Logs go to stderr so `issue` output can be piped.
    let log_config = LogConfig::from_section(&config.logging, config.server.debug)?;
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Serve { .. } => serve::run(&config).await,
        Commands::Issue { scope, ttl } => issue::run(&config, &scope, &ttl),
        Commands::Inspect { token } => inspect::run(&config, &token),
    }
}
