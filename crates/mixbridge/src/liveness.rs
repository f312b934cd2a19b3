//! Mixer liveness tracking
//!
//! The console drops remote clients that stop sending `/xremote`, and it says
//! nothing when it goes away. Every heartbeat interval the monitor sends
//! `/status` and `/xremote`, then judges the time since the last inbound message:
//!
//! - stale (older than `stale_after`): the miss counter grows; `max_missed`
//!   consecutive misses take the mixer from ONLINE to OFFLINE
//! - fresh: the counter resets; an OFFLINE mixer comes back ONLINE
//!
//! Only transitions are reported, once each.

use mixconf::TimingConfig;
use mixproto::address::{STATUS, XREMOTE};
use mixproto::OscMessage;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{recv_inbound, InboundReceiver};
use crate::transport::MixerSink;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Offline = 0,
    Online = 1,
}

impl LivenessState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => LivenessState::Online,
            _ => LivenessState::Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LivenessState::Online => "online",
            LivenessState::Offline => "offline",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, LivenessState::Online)
    }
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// How often to send `/status` + `/xremote` and evaluate
    pub interval: Duration,
    /// Silence longer than this makes a tick a miss
    pub stale_after: Duration,
    /// Consecutive misses before going OFFLINE
    pub max_missed: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(2),
            max_missed: 3,
        }
    }
}

impl From<&TimingConfig> for LivenessConfig {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            interval: timing.heartbeat(),
            stale_after: timing.stale_after(),
            max_missed: timing.max_missed,
        }
    }
}

/// A state change, reported once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LivenessState,
    pub to: LivenessState,
}

/// Liveness state for the mixer.
///
/// Atomic fields allow lock-free reads from the health endpoint.
pub struct HealthTracker {
    /// Last time any message arrived from the mixer (start time until then)
    last_response: RwLock<Instant>,
    consecutive_misses: AtomicU32,
    state: AtomicU8,
    config: LivenessConfig,
}

impl HealthTracker {
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            last_response: RwLock::new(Instant::now()),
            consecutive_misses: AtomicU32::new(0),
            state: AtomicU8::new(LivenessState::Online as u8),
            config,
        }
    }

    pub fn get_state(&self) -> LivenessState {
        LivenessState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: LivenessState) -> LivenessState {
        let prev = self.state.swap(state as u8, Ordering::Relaxed);
        LivenessState::from_u8(prev)
    }

    pub fn miss_count(&self) -> u32 {
        self.consecutive_misses.load(Ordering::Relaxed)
    }

    /// Any inbound message counts as a response
    pub async fn record_response(&self) {
        *self.last_response.write().await = Instant::now();
    }

    /// Evaluate one heartbeat window ending at `now`.
    pub async fn tick(&self, now: Instant) -> Option<Transition> {
        let last = *self.last_response.read().await;
        let silent_for = now.saturating_duration_since(last);

        if silent_for > self.config.stale_after {
            let misses = self.consecutive_misses.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("mixer silent for {:?} ({}/{})", silent_for, misses, self.config.max_missed);

            if misses >= self.config.max_missed && self.get_state() == LivenessState::Online {
                let from = self.set_state(LivenessState::Offline);
                return Some(Transition {
                    from,
                    to: LivenessState::Offline,
                });
            }
            None
        } else {
            self.consecutive_misses.store(0, Ordering::Relaxed);
            if self.get_state() == LivenessState::Offline {
                let from = self.set_state(LivenessState::Online);
                return Some(Transition {
                    from,
                    to: LivenessState::Online,
                });
            }
            None
        }
    }

    /// Get health summary for /health endpoint
    pub async fn health_summary(&self) -> serde_json::Value {
        let last = *self.last_response.read().await;
        let state = self.get_state();

        serde_json::json!({
            "state": state.as_str(),
            "online": state.is_online(),
            "consecutive_misses": self.miss_count(),
            "last_response_secs_ago": last.elapsed().as_secs(),
        })
    }
}

/// Callback for state changes
pub type StateChangeCallback = Box<dyn Fn(LivenessState, LivenessState) + Send + Sync>;

/// Spawn the heartbeat task.
///
/// Inbound messages refresh the tracker; each interval tick evaluates, reports
/// any transition through `on_change`, then sends the next heartbeat.
pub fn spawn_monitor(
    health: Arc<HealthTracker>,
    sink: Arc<dyn MixerSink>,
    mut rx: InboundReceiver,
    on_change: StateChangeCallback,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(health.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("liveness monitor shutting down");
                    break;
                }
                inbound = recv_inbound(&mut rx, "liveness") => match inbound {
                    Some(_) => health.record_response().await,
                    None => break,
                },
                now = interval.tick() => {
                    if let Some(Transition { from, to }) = health.tick(now).await {
                        match to {
                            LivenessState::Offline => warn!(
                                "mixer OFFLINE after {} missed heartbeats",
                                health.miss_count()
                            ),
                            LivenessState::Online => info!("mixer back ONLINE"),
                        }
                        on_change(from, to);
                    }
                    sink.send(&OscMessage::query(STATUS));
                    sink.send(&OscMessage::query(XREMOTE));
                }
            }
        }
    })
}
