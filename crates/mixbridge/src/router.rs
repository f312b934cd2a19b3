//! Live update fan-out
//!
//! Forwards mixer-originated value changes to the sessions watching that
//! address. Only messages whose first argument is numeric are forwarded.

use mixproto::{OscMessage, ServerEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::bus::{recv_inbound, InboundReceiver};
use crate::registry::SubscriptionRegistry;
use crate::session::SessionManager;

pub struct BroadcastRouter {
    registry: Arc<SubscriptionRegistry>,
    sessions: Arc<SessionManager>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>, sessions: Arc<SessionManager>) -> Self {
        Self { registry, sessions }
    }

    /// Push one message to its subscribers. Returns how many received it.
    pub fn route(&self, message: &OscMessage) -> usize {
        let Some(value) = message.first_arg().and_then(|arg| arg.as_f64()) else {
            return 0;
        };
        let targets = self.registry.sessions_for(&message.address);
        if targets.is_empty() {
            return 0;
        }

        let delivered = targets
            .into_iter()
            .filter(|id| {
                self.sessions.deliver(
                    *id,
                    ServerEvent::LiveUpdate {
                        address: message.address.clone(),
                        value,
                    },
                )
            })
            .count();
        trace!(address = %message.address, value, delivered, "live update");
        delivered
    }

    pub fn spawn(
        self: Arc<Self>,
        mut rx: InboundReceiver,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    inbound = recv_inbound(&mut rx, "router") => match inbound {
                        Some(inbound) => {
                            self.route(&inbound.message);
                        }
                        None => break,
                    }
                }
            }
            debug!("broadcast router stopped");
        })
    }
}
