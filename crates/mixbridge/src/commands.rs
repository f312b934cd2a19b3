//! CLI command implementations

use anyhow::{Context, Result};
use mixconf::BridgeConfig;
use mixproto::{address, MixerColor, OscMessage};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::InboundBus;
use crate::correlator::Correlator;
use crate::probe::{run_probe, ProbeConfig};
use crate::transport::{resolve_endpoint, MixerSink, Transport};

/// A transport with its reader running, for one-shot commands
struct Connection {
    transport: Arc<Transport>,
    bus: InboundBus,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    opened_at: tokio::time::Instant,
}

impl Connection {
    async fn open(config: &BridgeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let endpoint = config
            .mixer
            .endpoint()
            .context("Mixer host is not configured")?;
        let remote = resolve_endpoint(&endpoint).await?;
        let transport = Arc::new(Transport::bind_port(config.mixer.local_port, remote).await?);
        let opened_at = tokio::time::Instant::now();

        let bus = InboundBus::default();
        let cancel = CancellationToken::new();
        let reader = transport.spawn_reader(bus.clone(), cancel.clone());

        Ok(Self {
            transport,
            bus,
            cancel,
            reader,
            opened_at,
        })
    }

    async fn close(self) {
        self.cancel.cancel();
        let _ = self.reader.await;
    }
}

/// Run the startup probe on its own and report the result
pub async fn probe(config: &BridgeConfig) -> Result<()> {
    let conn = Connection::open(config).await?;
    let rx = conn.bus.subscribe();
    let result = run_probe(
        conn.transport.as_ref(),
        rx,
        conn.opened_at,
        &ProbeConfig::from(&config.timing),
    )
    .await;
    let remote = conn.transport.remote();
    conn.close().await;

    let outcome = result.with_context(|| format!("Mixer at {} is not reachable", remote))?;
    println!(
        "Mixer at {} answered {} in {:?}",
        remote, outcome.address, outcome.elapsed
    );
    Ok(())
}

/// One correlated query, printed as JSON
pub async fn get(config: &BridgeConfig, address: &str) -> Result<()> {
    let conn = Connection::open(config).await?;
    let correlator = Arc::new(Correlator::new(
        conn.transport.clone(),
        config.timing.query_timeout(),
    ));
    let listener = correlator.spawn_listener(conn.bus.subscribe(), conn.cancel.clone());

    let result = correlator.query(address).await;
    conn.close().await;
    let _ = listener.await;

    let value = result.with_context(|| format!("No answer for {}", address))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// One float write, sent immediately
pub async fn set(config: &BridgeConfig, address: &str, value: f32) -> Result<()> {
    let conn = Connection::open(config).await?;
    conn.transport.send(&OscMessage::float(address, value));
    println!("{} <- {}", address, value);
    conn.close().await;
    Ok(())
}

/// Look up the scribble-strip color for a parameter address
pub async fn color(config: &BridgeConfig, param_address: &str) -> Result<()> {
    let slot = address::color_slot_for(param_address)
        .with_context(|| format!("{} has no color slot", param_address))?;

    let conn = Connection::open(config).await?;
    let correlator = Arc::new(Correlator::new(
        conn.transport.clone(),
        config.timing.query_timeout(),
    ));
    let listener = correlator.spawn_listener(conn.bus.subscribe(), conn.cancel.clone());

    let result = correlator.query(&slot).await;
    conn.close().await;
    let _ = listener.await;

    let value = result.with_context(|| format!("No answer for {}", slot))?;
    let index = value
        .as_f64()
        .map(|v| v.round() as i64)
        .with_context(|| format!("{} answered a non-numeric color", slot))?;
    match MixerColor::from_index(index) {
        Some(color) => println!("{} ({}): {} [{}]", param_address, slot, color, index),
        None => println!("{} ({}): unknown color {}", param_address, slot, index),
    }
    Ok(())
}

/// Print the effective configuration and where it came from
pub fn show_config(config: &BridgeConfig, sources: &mixconf::ConfigSources) {
    for file in &sources.files {
        println!("# loaded: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env: {}", var);
    }
    print!("{}", config.to_toml());
}
