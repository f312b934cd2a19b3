//! Query/answer correlation by address
//!
//! The mixer has no request ids: an argument-less message is a query and the
//! answer is a message to the same address carrying the value. Waiters are kept
//! per address and completed by the first inbound message with at least one
//! argument.
//!
//! Concurrent queries for the same address each send their own datagram and keep
//! their own deadline, but all of them complete on the first matching answer.

use dashmap::DashMap;
use mixproto::{OscMessage, ProtocolValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::bus::{recv_inbound, InboundReceiver};
use crate::error::{BridgeError, Result};
use crate::transport::MixerSink;

/// A pending query waiting for its answer
struct Waiter {
    id: u64,
    response_tx: oneshot::Sender<ProtocolValue>,
}

pub struct Correlator {
    sink: Arc<dyn MixerSink>,
    waiters: DashMap<String, Vec<Waiter>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl Correlator {
    pub fn new(sink: Arc<dyn MixerSink>, timeout: Duration) -> Self {
        Self {
            sink,
            waiters: DashMap::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// Ask the mixer for the current value at `address`.
    ///
    /// Fails with [`BridgeError::QueryTimeout`] once the timeout elapses. Dropping
    /// the future deregisters the waiter.
    pub async fn query(&self, address: &str) -> Result<ProtocolValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (response_tx, response_rx) = oneshot::channel();

        self.waiters
            .entry(address.to_string())
            .or_default()
            .push(Waiter { id, response_tx });
        let _registration = Registration {
            waiters: &self.waiters,
            address,
            id,
        };
        trace!(address, id, "query registered");

        self.sink.send(&OscMessage::query(address));

        match tokio::time::timeout(self.timeout, response_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(BridgeError::QueryAbandoned {
                address: address.to_string(),
            }),
            Err(_) => {
                debug!(address, "query timed out after {:?}", self.timeout);
                Err(BridgeError::QueryTimeout {
                    address: address.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Complete every waiter for the message's address. Returns how many completed.
    ///
    /// Messages without arguments are echoes of queries, not answers.
    pub fn resolve(&self, message: &OscMessage) -> usize {
        let Some(arg) = message.first_arg() else {
            return 0;
        };
        let Some((_, waiters)) = self.waiters.remove(&message.address) else {
            return 0;
        };

        let value = ProtocolValue::from_arg(arg);
        let completed = waiters.len();
        for waiter in waiters {
            if waiter.response_tx.send(value.clone()).is_err() {
                trace!(address = %message.address, id = waiter.id, "waiter already gone");
            }
        }
        trace!(address = %message.address, completed, "answer correlated");
        completed
    }

    /// Number of queries currently waiting, across all addresses
    pub fn pending(&self) -> usize {
        self.waiters.iter().map(|entry| entry.value().len()).sum()
    }

    /// Feed inbound bus traffic into [`Correlator::resolve`] until cancelled.
    pub fn spawn_listener(
        self: &Arc<Self>,
        mut rx: InboundReceiver,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let correlator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    inbound = recv_inbound(&mut rx, "correlator") => match inbound {
                        Some(inbound) => {
                            correlator.resolve(&inbound.message);
                        }
                        None => break,
                    }
                }
            }
            debug!("correlator listener stopped");
        })
    }
}

/// Removes one waiter when the query finishes, times out or is dropped
struct Registration<'a> {
    waiters: &'a DashMap<String, Vec<Waiter>>,
    address: &'a str,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Some(mut list) = self.waiters.get_mut(self.address) {
            list.retain(|w| w.id != self.id);
        }
        self.waiters.remove_if(self.address, |_, list| list.is_empty());
    }
}
