//! mixbridge - OSC mixer ↔ WebSocket bridge library
//!
//! This library provides:
//! - `transport`: UDP socket to the mixer, decoding datagrams onto the inbound bus
//! - `bus`: typed broadcast of inbound mixer messages
//! - `probe`: startup reachability check
//! - `correlator`: query/answer matching by address
//! - `registry`: which session watches which address
//! - `throttle`: per-session write coalescing
//! - `liveness`: heartbeat and ONLINE/OFFLINE tracking
//! - `router`: fan-out of live updates to subscribed sessions
//! - `session`: WebSocket client sessions and request dispatch
//! - `bridge`: the context that owns all of the above
//! - `serve`: HTTP/WebSocket server

pub mod bridge;
pub mod bus;
pub mod commands;
pub mod correlator;
pub mod error;
pub mod liveness;
pub mod probe;
pub mod registry;
pub mod router;
pub mod serve;
pub mod session;
pub mod telemetry;
pub mod throttle;
pub mod timer;
pub mod tls;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::Bridge;
pub use error::{BridgeError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one connected WebSocket client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
