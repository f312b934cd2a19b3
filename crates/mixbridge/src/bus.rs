//! Inbound message bus
//!
//! Every decoded mixer message is published once on a tokio broadcast channel.
//! The probe, correlator, liveness monitor and router each hold their own receiver.

use mixproto::address::{INFO, STATUS, XINFO};
use mixproto::OscMessage;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel depth; a receiver that falls further behind skips ahead
pub const BUS_CAPACITY: usize = 1024;

/// Closed classification of inbound traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// `/status` replies
    Status,
    /// `/info` and `/xinfo` replies
    Info,
    /// Everything else: parameter values, meters, names
    Parameter,
}

impl InboundKind {
    pub fn classify(address: &str) -> Self {
        match address {
            STATUS => InboundKind::Status,
            INFO | XINFO => InboundKind::Info,
            _ => InboundKind::Parameter,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub kind: InboundKind,
    pub message: OscMessage,
}

impl Inbound {
    pub fn new(message: OscMessage) -> Self {
        Self {
            kind: InboundKind::classify(&message.address),
            message,
        }
    }

    pub fn address(&self) -> &str {
        &self.message.address
    }
}

pub type InboundReceiver = broadcast::Receiver<Arc<Inbound>>;

#[derive(Clone)]
pub struct InboundBus {
    tx: broadcast::Sender<Arc<Inbound>>,
}

impl InboundBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish one message; returns how many receivers saw it
    pub fn publish(&self, message: OscMessage) -> usize {
        let inbound = Arc::new(Inbound::new(message));
        match self.tx.send(inbound) {
            Ok(n) => n,
            Err(e) => {
                trace!("No bus listeners for {}", e.0.address());
                0
            }
        }
    }

    pub fn subscribe(&self) -> InboundReceiver {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for InboundBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

/// Next message from the bus, skipping over lag. `None` once every sender is gone.
pub async fn recv_inbound(rx: &mut InboundReceiver, listener: &str) -> Option<Arc<Inbound>> {
    loop {
        match rx.recv().await {
            Ok(inbound) => return Some(inbound),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("{}: lagged behind inbound bus, skipped {} messages", listener, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
