//! Bridge context
//!
//! One `Bridge` per process owns every component and is shared with the HTTP
//! layer as axum state.

use mixconf::TimingConfig;
use mixproto::ServerEvent;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::InboundBus;
use crate::correlator::Correlator;
use crate::liveness::{spawn_monitor, HealthTracker, LivenessConfig, LivenessState};
use crate::registry::SubscriptionRegistry;
use crate::router::BroadcastRouter;
use crate::session::SessionManager;
use crate::throttle::ThrottleEngine;
use crate::transport::MixerSink;

pub struct Bridge {
    pub sink: Arc<dyn MixerSink>,
    pub bus: InboundBus,
    pub registry: Arc<SubscriptionRegistry>,
    pub throttle: Arc<ThrottleEngine>,
    pub correlator: Arc<Correlator>,
    pub health: Arc<HealthTracker>,
    pub sessions: Arc<SessionManager>,
    pub router: Arc<BroadcastRouter>,
    /// Mixer endpoint, for display
    pub mixer: String,
    pub started_at: Instant,
    pub shutdown: CancellationToken,
}

impl Bridge {
    pub fn new(
        sink: Arc<dyn MixerSink>,
        bus: InboundBus,
        timing: &TimingConfig,
        mixer: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let registry = Arc::new(SubscriptionRegistry::new());
        let throttle = Arc::new(ThrottleEngine::new(Arc::clone(&sink), timing.throttle()));
        let correlator = Arc::new(Correlator::new(Arc::clone(&sink), timing.query_timeout()));
        let health = Arc::new(HealthTracker::new(LivenessConfig::from(timing)));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&registry),
            Arc::clone(&throttle),
            Arc::clone(&correlator),
            shutdown.clone(),
        ));
        let router = Arc::new(BroadcastRouter::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
        ));

        Arc::new(Self {
            sink,
            bus,
            registry,
            throttle,
            correlator,
            health,
            sessions,
            router,
            mixer: mixer.into(),
            started_at: Instant::now(),
            shutdown,
        })
    }

    /// Start the bus listeners: correlator, liveness monitor, router.
    ///
    /// They run until the shutdown token is cancelled.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let correlator = self
            .correlator
            .spawn_listener(self.bus.subscribe(), self.shutdown.clone());

        let sessions = Arc::clone(&self.sessions);
        let monitor = spawn_monitor(
            Arc::clone(&self.health),
            Arc::clone(&self.sink),
            self.bus.subscribe(),
            Box::new(move |_from, to| {
                sessions.broadcast(&ServerEvent::LivenessStatus {
                    online: to == LivenessState::Online,
                });
            }),
            self.shutdown.clone(),
        );

        let router = Arc::clone(&self.router).spawn(self.bus.subscribe(), self.shutdown.clone());

        vec![correlator, monitor, router]
    }

    pub async fn health_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "healthy",
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
            "mixer": {
                "endpoint": self.mixer,
                "liveness": self.health.health_summary().await,
            },
            "sessions": self.sessions.session_count(),
            "watched_addresses": self.registry.address_count(),
        })
    }
}
