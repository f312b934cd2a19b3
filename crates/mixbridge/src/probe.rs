//! Startup reachability probe
//!
//! Before serving anything the bridge makes sure the mixer answers. Three
//! queries go out staggered from the moment the socket opened; the first reply
//! from a liveness-indicating address wins. Other traffic inside the window is
//! logged and ignored.

use mixconf::TimingConfig;
use mixproto::address::{is_liveness_indicator, PROBE_QUERIES};
use mixproto::OscMessage;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::bus::{recv_inbound, InboundReceiver};
use crate::error::{BridgeError, Result};
use crate::transport::MixerSink;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Gap between consecutive probe queries
    pub stagger: Duration,
    /// Overall window, measured from socket open
    pub deadline: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stagger: Duration::from_millis(150),
            deadline: Duration::from_millis(1200),
        }
    }
}

impl From<&TimingConfig> for ProbeConfig {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            stagger: timing.probe_stagger(),
            deadline: timing.probe_deadline(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Address of the reply that proved the mixer is there
    pub address: String,
    /// Time from socket open to that reply
    pub elapsed: Duration,
}

/// Run the probe. `rx` must be subscribed before the transport starts reading.
pub async fn run_probe(
    sink: &dyn MixerSink,
    mut rx: InboundReceiver,
    opened_at: Instant,
    config: &ProbeConfig,
) -> Result<ProbeOutcome> {
    let deadline = tokio::time::sleep_until(opened_at + config.deadline);
    tokio::pin!(deadline);
    let mut sent = 0usize;

    loop {
        let next_send = opened_at + config.stagger * sent as u32;

        tokio::select! {
            biased;
            inbound = recv_inbound(&mut rx, "probe") => {
                let Some(inbound) = inbound else {
                    return Err(BridgeError::BusClosed);
                };
                if is_liveness_indicator(inbound.address()) {
                    let outcome = ProbeOutcome {
                        address: inbound.address().to_string(),
                        elapsed: opened_at.elapsed(),
                    };
                    info!("mixer answered {} after {:?}", outcome.address, outcome.elapsed);
                    return Ok(outcome);
                }
                debug!("probe ignoring {}", inbound.address());
            }
            _ = tokio::time::sleep_until(next_send), if sent < PROBE_QUERIES.len() => {
                let address = PROBE_QUERIES[sent];
                debug!("probe {} -> {}", sent + 1, address);
                sink.send(&OscMessage::query(address));
                sent += 1;
            }
            _ = &mut deadline => {
                return Err(BridgeError::MixerUnreachable {
                    deadline: config.deadline,
                });
            }
        }
    }
}
