//! WebSocket client sessions
//!
//! Each connected client gets a [`SessionId`], an outbound event queue and a
//! cancellation token for its in-flight queries. Requests are dispatched to the
//! registry, throttle engine and correlator; disconnect tears all of that down.

use dashmap::DashMap;
use mixproto::{ClientRequest, MixerColor, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::correlator::Correlator;
use crate::registry::SubscriptionRegistry;
use crate::throttle::ThrottleEngine;
use crate::SessionId;

/// Size of the per-session event buffer
pub const SESSION_BUFFER_SIZE: usize = 256;

struct SessionEntry {
    tx: mpsc::Sender<ServerEvent>,
    cancel: CancellationToken,
}

pub struct SessionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    registry: Arc<SubscriptionRegistry>,
    throttle: Arc<ThrottleEngine>,
    correlator: Arc<Correlator>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        throttle: Arc<ThrottleEngine>,
        correlator: Arc<Correlator>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            registry,
            throttle,
            correlator,
            shutdown,
        }
    }

    /// Register a new client. Events for it arrive on the returned receiver.
    pub fn connect(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER_SIZE);
        self.sessions.insert(
            id,
            SessionEntry {
                tx,
                cancel: self.shutdown.child_token(),
            },
        );
        info!(session = %id, "client connected ({} total)", self.sessions.len());
        (id, rx)
    }

    /// Parse one text frame and dispatch it. Malformed frames are dropped.
    pub fn handle_text(&self, id: SessionId, text: &str) {
        match ClientRequest::from_json(text) {
            Ok(request) => self.handle(id, request),
            Err(e) => debug!(session = %id, "dropping malformed request: {}", e),
        }
    }

    pub fn handle(&self, id: SessionId, request: ClientRequest) {
        if let Err(e) = request.validate() {
            debug!(session = %id, "dropping invalid request: {}", e);
            return;
        }
        let Some((tx, cancel)) = self
            .sessions
            .get(&id)
            .map(|entry| (entry.tx.clone(), entry.cancel.clone()))
        else {
            debug!(session = %id, "request for unknown session");
            return;
        };

        match request {
            ClientRequest::Subscribe { address } => {
                self.registry.subscribe(id, &address);
                self.spawn_snapshot(id, address, tx, cancel);
            }
            ClientRequest::Unsubscribe { address } => {
                self.registry.unsubscribe(id, &address);
            }
            ClientRequest::Write { address, value } => {
                self.throttle.write(id, &address, value as f32);
            }
            ClientRequest::QueryColor { color_address } => {
                self.spawn_color_query(id, color_address, tx, cancel);
            }
        }
    }

    /// Answer a subscribe with the current value as a one-element snapshot.
    fn spawn_snapshot(
        &self,
        id: SessionId,
        address: String,
        tx: mpsc::Sender<ServerEvent>,
        cancel: CancellationToken,
    ) {
        let correlator = Arc::clone(&self.correlator);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = correlator.query(&address) => match result {
                    Ok(value) => {
                        if tx.send(ServerEvent::snapshot_of(address, value)).await.is_err() {
                            trace!(session = %id, "session gone before snapshot");
                        }
                    }
                    Err(e) => warn!(session = %id, "snapshot query failed: {}", e),
                }
            }
        });
    }

    /// Answer a color query with the rounded color index, or null.
    fn spawn_color_query(
        &self,
        id: SessionId,
        color_address: String,
        tx: mpsc::Sender<ServerEvent>,
        cancel: CancellationToken,
    ) {
        let correlator = Arc::clone(&self.correlator);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = correlator.query(&color_address) => {
                    let color = match result {
                        Ok(value) => value.as_f64().map(|v| v.round() as i64),
                        Err(e) => {
                            debug!(session = %id, "color query failed: {}", e);
                            None
                        }
                    };
                    if let Some(name) = color.and_then(MixerColor::from_index) {
                        debug!(session = %id, "{} is {}", color_address, name);
                    }
                    let event = ServerEvent::ColorResponse { color_address, color };
                    if tx.send(event).await.is_err() {
                        trace!(session = %id, "session gone before color response");
                    }
                }
            }
        });
    }

    /// Queue an event for one session without waiting. Returns false if it
    /// could not be queued (gone, or its buffer is full).
    pub fn deliver(&self, id: SessionId, event: ServerEvent) -> bool {
        let Some(tx) = self.sessions.get(&id).map(|entry| entry.tx.clone()) else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(session = %id, "event buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Queue an event for every connected session, waiting for buffer space
    /// where a session is backlogged. Returns how many sessions it targets.
    ///
    /// Each delivery runs on its own task until it is queued or the session
    /// disconnects.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let targets: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.tx.clone(), entry.cancel.clone()))
            .collect();
        let count = targets.len();

        for (id, tx, cancel) in targets {
            let event = event.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    result = tx.send(event) => {
                        if result.is_err() {
                            trace!(session = %id, "session gone before broadcast");
                        }
                    }
                }
            });
        }
        count
    }

    /// Cancel in-flight work and drop every trace of the session.
    pub fn disconnect(&self, id: SessionId) {
        let Some((_, entry)) = self.sessions.remove(&id) else {
            return;
        };
        entry.cancel.cancel();
        let subscriptions = self.registry.teardown(id);
        let discarded = self.throttle.teardown(id);
        info!(
            session = %id,
            subscriptions,
            discarded,
            "client disconnected ({} remaining)",
            self.sessions.len()
        );
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }
}
