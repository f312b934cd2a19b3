//! mixbridge - X-Air mixer ↔ WebSocket bridge
//!
//! Subcommands:
//! - `mixbridge serve` - Run the bridge (UDP ↔ HTTP/WebSocket)
//! - `mixbridge probe` - Check the mixer answers
//! - `mixbridge get <address>` - Query one parameter
//! - `mixbridge set <address> <value>` - Write one float parameter
//! - `mixbridge color <address>` - Look up a parameter's scribble-strip color
//! - `mixbridge config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mixbridge::{commands, serve, telemetry};
use mixconf::BridgeConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mixbridge")]
#[command(about = "Bridge between an X-Air OSC mixer and WebSocket clients")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./mixbridge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Mixer host or IP, overrides config
    #[arg(short, long, global = true)]
    mixer: Option<String>,

    /// Local UDP port for mixer replies, overrides config
    #[arg(long, global = true)]
    local_port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge server
    Serve {
        /// HTTP port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that the mixer answers
    Probe,

    /// Query one parameter and print its value as JSON
    Get {
        /// OSC address (e.g., /ch/01/mix/fader)
        address: String,
    },

    /// Write one float parameter
    Set {
        /// OSC address
        address: String,

        /// Value, usually 0.0-1.0
        value: f32,
    },

    /// Look up the scribble-strip color of a parameter
    Color {
        /// Parameter address (e.g., /ch/03/mix/07/level)
        address: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = BridgeConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(host) = cli.mixer {
        config.mixer.host = Some(host);
    }
    if let Some(port) = cli.local_port {
        config.mixer.local_port = port;
    }

    // For serve, use the configured telemetry; for CLI commands, use simple tracing
    match &cli.command {
        Commands::Serve { .. } => telemetry::init(&config.telemetry)?,
        _ => telemetry::init_fmt("warn")?,
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.http_port = port;
            }
            serve::run(config).await?;
        }
        Commands::Probe => commands::probe(&config).await?,
        Commands::Get { address } => commands::get(&config, &address).await?,
        Commands::Set { address, value } => commands::set(&config, &address, value).await?,
        Commands::Color { address } => commands::color(&config, &address).await?,
        Commands::Config => commands::show_config(&config, &sources),
    }

    Ok(())
}
