//! Timing knobs for the bridge core.
//!
//! Defaults match the mixer's expectations: the X-Air family drops its remote
//! session roughly 10s after the last `/xremote`, and 16ms keeps fader drags
//! close to a 60Hz update rate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Gap between the staggered startup probes.
    /// Default: 150
    #[serde(default = "TimingConfig::default_probe_stagger_ms")]
    pub probe_stagger_ms: u64,

    /// Overall startup probe deadline, measured from socket open.
    /// Default: 1200
    #[serde(default = "TimingConfig::default_probe_deadline_ms")]
    pub probe_deadline_ms: u64,

    /// Correlated query timeout.
    /// Default: 500
    #[serde(default = "TimingConfig::default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Write coalescing window per (session, address).
    /// Default: 16
    #[serde(default = "TimingConfig::default_throttle_ms")]
    pub throttle_ms: u64,

    /// Heartbeat cadence.
    /// Default: 1000
    #[serde(default = "TimingConfig::default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// A tick counts as missed when the last response is older than this.
    /// Default: 2000
    #[serde(default = "TimingConfig::default_stale_after_ms")]
    pub stale_after_ms: u64,

    /// Consecutive missed ticks before the mixer is reported offline.
    /// Default: 3
    #[serde(default = "TimingConfig::default_max_missed")]
    pub max_missed: u32,
}

impl TimingConfig {
    fn default_probe_stagger_ms() -> u64 {
        150
    }

    fn default_probe_deadline_ms() -> u64 {
        1200
    }

    fn default_query_timeout_ms() -> u64 {
        500
    }

    fn default_throttle_ms() -> u64 {
        16
    }

    fn default_heartbeat_ms() -> u64 {
        1000
    }

    fn default_stale_after_ms() -> u64 {
        2000
    }

    fn default_max_missed() -> u32 {
        3
    }

    pub fn probe_stagger(&self) -> Duration {
        Duration::from_millis(self.probe_stagger_ms)
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_millis(self.probe_deadline_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            probe_stagger_ms: Self::default_probe_stagger_ms(),
            probe_deadline_ms: Self::default_probe_deadline_ms(),
            query_timeout_ms: Self::default_query_timeout_ms(),
            throttle_ms: Self::default_throttle_ms(),
            heartbeat_ms: Self::default_heartbeat_ms(),
            stale_after_ms: Self::default_stale_after_ms(),
            max_missed: Self::default_max_missed(),
        }
    }
}
