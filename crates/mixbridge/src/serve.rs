//! Bridge server
//!
//! Startup order: bind the UDP socket, probe the mixer (fatal on silence), start
//! the bus listeners, then serve HTTP/WebSocket until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use axum::{extract::State, http::Method, routing::get, Json, Router};
use mixconf::BridgeConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bridge::Bridge;
use crate::bus::InboundBus;
use crate::probe::{run_probe, ProbeConfig};
use crate::tls;
use crate::transport::{resolve_endpoint, Transport};
use crate::ws::ws_handler;

/// How long open connections get to finish after a shutdown signal
const GRACE_PERIOD: Duration = Duration::from_secs(5);

async fn handle_root() -> &'static str {
    "Bridge running"
}

/// Health check endpoint
async fn handle_health(State(bridge): State<Arc<Bridge>>) -> Json<serde_json::Value> {
    Json(bridge.health_summary().await)
}

/// HTTP routes: `/`, `/health` and the `/ws` upgrade.
pub fn router(bridge: Arc<Bridge>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(bridge)
}

/// Run the bridge until a shutdown signal arrives.
pub async fn run(config: BridgeConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let endpoint = config
        .mixer
        .endpoint()
        .context("Mixer host is not configured")?;

    info!("🎚️ mixbridge starting");
    info!("   Mixer: {}", endpoint);

    let remote = resolve_endpoint(&endpoint).await?;
    let transport = Arc::new(
        Transport::bind_port(config.mixer.local_port, remote)
            .await
            .context("Failed to open UDP transport")?,
    );
    let opened_at = tokio::time::Instant::now();

    let shutdown = CancellationToken::new();
    let bus = InboundBus::default();
    let probe_rx = bus.subscribe();
    let reader = transport.spawn_reader(bus.clone(), shutdown.clone());

    let probe = run_probe(
        transport.as_ref(),
        probe_rx,
        opened_at,
        &ProbeConfig::from(&config.timing),
    )
    .await;
    let outcome = match probe {
        Ok(outcome) => outcome,
        Err(e) => {
            shutdown.cancel();
            let _ = reader.await;
            return Err(e).with_context(|| format!("Mixer at {} is not reachable", endpoint));
        }
    };
    info!("   ✅ Mixer answered {} in {:?}", outcome.address, outcome.elapsed);

    let bridge = Bridge::new(
        transport.clone(),
        bus,
        &config.timing,
        endpoint,
        shutdown.clone(),
    );
    let tasks = bridge.start();
    let app = router(Arc::clone(&bridge));

    let addr: SocketAddr = config
        .server
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen_addr()))?;

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let served = if config.tls.enabled {
        serve_tls(app, addr, &config, shutdown.clone()).await
    } else {
        serve_plain(app, addr, shutdown.clone()).await
    };

    shutdown.cancel();
    for task in tasks {
        let _ = task.await;
    }
    let _ = reader.await;

    served?;
    info!("Shutdown complete");
    Ok(())
}

async fn serve_plain(app: Router, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🎚️ mixbridge ready!");
    info!("   WebSocket: ws://{}/ws", addr);
    info!("   Health: GET http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")
}

async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    config: &BridgeConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let rustls = tls::load_rustls_config(&config.tls).await?;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown.cancelled().await;
            handle.graceful_shutdown(Some(GRACE_PERIOD));
        }
    });

    info!("🎚️ mixbridge ready!");
    info!("   WebSocket: wss://{}/ws", addr);
    info!("   Health: GET https://{}/health", addr);

    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .with_context(|| format!("Failed to serve HTTPS on {}", addr))
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
