//! Bridge error types

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No reply with a value arrived for a correlated query
    #[error("query for {address} timed out after {timeout:?}")]
    QueryTimeout { address: String, timeout: Duration },

    /// The waiter was dropped without an answer (shutdown)
    #[error("query for {address} was abandoned")]
    QueryAbandoned { address: String },

    #[error("mixer did not answer any probe within {deadline:?}")]
    MixerUnreachable { deadline: Duration },

    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("could not resolve mixer endpoint {endpoint}")]
    Resolve { endpoint: String },

    #[error("inbound bus closed")]
    BusClosed,
}

impl BridgeError {
    /// Timeouts are expected in normal operation and reported to clients as null
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::QueryTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
