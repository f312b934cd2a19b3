//! UDP transport to the mixer
//!
//! Outbound sends are fire-and-forget: the caller never sees a network error,
//! failures are logged at warn. Inbound datagrams are decoded (bundles flattened)
//! and published on the [`InboundBus`] one message at a time.

use mixproto::{decode_packet, OscMessage};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::bus::InboundBus;
use crate::error::{BridgeError, Result};

/// Largest UDP payload
const MAX_DATAGRAM: usize = 65_535;

/// Anything that can put an OSC message on the wire towards the mixer
pub trait MixerSink: Send + Sync {
    fn send(&self, message: &OscMessage);
}

pub struct Transport {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
}

impl Transport {
    /// Bind the receive socket on all interfaces at `local_port`.
    pub async fn bind_port(local_port: u16, remote: SocketAddr) -> Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, local_port)), remote).await
    }

    pub async fn bind(local: SocketAddr, remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| BridgeError::Bind {
                port: local.port(),
                source,
            })?;

        info!(
            "UDP transport bound on {} (mixer at {})",
            socket.local_addr().unwrap_or(local),
            remote
        );

        Ok(Self {
            socket: Arc::new(socket),
            remote,
        })
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    /// Spawn the receive loop. It stops when `cancel` fires.
    pub fn spawn_reader(&self, bus: InboundBus, cancel: CancellationToken) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("UDP reader shutting down");
                        break;
                    }
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((len, from)) => publish_datagram(&bus, &buf[..len], from),
                        Err(e) => {
                            // ICMP port unreachable surfaces here on some platforms
                            debug!("UDP receive error: {}", e);
                        }
                    }
                }
            }
        })
    }
}

impl MixerSink for Transport {
    fn send(&self, message: &OscMessage) {
        let packet = message.encode();
        match self.socket.try_send_to(&packet, self.remote) {
            Ok(_) => trace!(address = %message.address, "sent {} bytes", packet.len()),
            Err(e) => warn!(address = %message.address, "UDP send to {} failed: {}", self.remote, e),
        }
    }
}

fn publish_datagram(bus: &InboundBus, datagram: &[u8], from: SocketAddr) {
    match decode_packet(datagram) {
        Ok(messages) => {
            for message in messages {
                trace!(address = %message.address, "inbound from {}", from);
                bus.publish(message);
            }
        }
        Err(e) => {
            debug!("Dropping undecodable datagram from {} ({} bytes): {}", from, datagram.len(), e);
        }
    }
}

/// Resolve `host:port` to a socket address.
pub async fn resolve_endpoint(endpoint: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(endpoint)
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| BridgeError::Resolve {
            endpoint: endpoint.to_string(),
        })
}
