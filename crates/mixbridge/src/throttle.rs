//! Per-session write coalescing
//!
//! Fader drags produce far more writes than the mixer needs. Each
//! (session, address) key keeps only the latest value and at most one scheduled
//! flush; the flush sends whatever value is current when it fires.

use dashmap::DashMap;
use mixproto::OscMessage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::timer::TimerHandle;
use crate::transport::MixerSink;
use crate::SessionId;

struct Bucket {
    value: f32,
    flush: Option<TimerHandle>,
}

type Buckets = DashMap<SessionId, HashMap<String, Bucket>>;

pub struct ThrottleEngine {
    sink: Arc<dyn MixerSink>,
    window: Duration,
    buckets: Arc<Buckets>,
}

impl ThrottleEngine {
    pub fn new(sink: Arc<dyn MixerSink>, window: Duration) -> Self {
        Self {
            sink,
            window,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Record a write. The first write in a window schedules the flush; later
    /// ones only replace the value.
    pub fn write(&self, session: SessionId, address: &str, value: f32) {
        let mut session_buckets = self.buckets.entry(session).or_default();
        let bucket = session_buckets
            .entry(address.to_string())
            .or_insert(Bucket { value, flush: None });
        bucket.value = value;

        if bucket.flush.is_none() {
            let buckets = Arc::clone(&self.buckets);
            let sink = Arc::clone(&self.sink);
            let address = address.to_string();
            bucket.flush = Some(TimerHandle::schedule(self.window, move || {
                flush(&buckets, sink.as_ref(), session, &address);
            }));
        }
    }

    /// Cancel the session's scheduled flushes and discard pending values.
    pub fn teardown(&self, session: SessionId) -> usize {
        let Some((_, buckets)) = self.buckets.remove(&session) else {
            return 0;
        };
        for bucket in buckets.values() {
            if let Some(flush) = &bucket.flush {
                flush.cancel();
            }
        }
        if !buckets.is_empty() {
            debug!(%session, discarded = buckets.len(), "pending writes discarded");
        }
        buckets.len()
    }

    /// Keys with a flush still scheduled for this session
    pub fn pending(&self, session: SessionId) -> usize {
        self.buckets.get(&session).map(|b| b.len()).unwrap_or(0)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Send the current value for one key and clear its bucket.
///
/// The send happens under the session's map entry so a concurrent teardown
/// either sees the bucket or the send has already happened.
fn flush(buckets: &Buckets, sink: &dyn MixerSink, session: SessionId, address: &str) {
    let Some(mut session_buckets) = buckets.get_mut(&session) else {
        return;
    };
    let Some(bucket) = session_buckets.remove(address) else {
        return;
    };
    trace!(%session, address, value = bucket.value, "flushing write");
    sink.send(&OscMessage::float(address, bucket.value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    const WINDOW: Duration = Duration::from_millis(16);

    fn engine() -> (ThrottleEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (ThrottleEngine::new(sink.clone(), WINDOW), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_sends_last_value_once() {
        let (engine, sink) = engine();
        let session = SessionId::new();

        for i in 1..=10 {
            engine.write(session, "/ch/01/mix/fader", i as f32 / 10.0);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(sink.messages().is_empty());

        tokio::time::sleep(WINDOW).await;
        assert_eq!(
            sink.messages(),
            vec![OscMessage::float("/ch/01/mix/fader", 1.0)]
        );
        assert_eq!(engine.pending(session), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn next_window_sends_again() {
        let (engine, sink) = engine();
        let session = SessionId::new();

        engine.write(session, "/lr/mix/fader", 0.2);
        tokio::time::sleep(WINDOW * 2).await;
        engine.write(session, "/lr/mix/fader", 0.4);
        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(
            sink.messages(),
            vec![
                OscMessage::float("/lr/mix/fader", 0.2),
                OscMessage::float("/lr/mix/fader", 0.4),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let (engine, sink) = engine();
        let a = SessionId::new();
        let b = SessionId::new();

        engine.write(a, "/ch/01/mix/fader", 0.1);
        engine.write(a, "/ch/02/mix/fader", 0.2);
        engine.write(b, "/ch/01/mix/fader", 0.3);
        tokio::time::sleep(WINDOW * 2).await;

        let mut sent: Vec<(String, f32)> = sink
            .messages()
            .into_iter()
            .map(|m| match m.first_arg() {
                Some(mixproto::OscArg::Float(v)) => (m.address.clone(), *v),
                other => panic!("unexpected arg {:?}", other),
            })
            .collect();
        sent.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(
            sent,
            vec![
                ("/ch/01/mix/fader".to_string(), 0.1),
                ("/ch/01/mix/fader".to_string(), 0.3),
                ("/ch/02/mix/fader".to_string(), 0.2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_flush() {
        let (engine, sink) = engine();
        let session = SessionId::new();

        engine.write(session, "/ch/05/mix/fader", 0.9);
        engine.write(session, "/ch/06/mix/fader", 0.8);
        assert_eq!(engine.pending(session), 2);

        assert_eq!(engine.teardown(session), 2);
        tokio::time::sleep(WINDOW * 4).await;

        assert!(sink.messages().is_empty());
        assert_eq!(engine.pending(session), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_leaves_other_sessions() {
        let (engine, sink) = engine();
        let gone = SessionId::new();
        let stays = SessionId::new();

        engine.write(gone, "/lr/mix/fader", 0.1);
        engine.write(stays, "/lr/mix/fader", 0.7);
        engine.teardown(gone);
        tokio::time::sleep(WINDOW * 2).await;

        assert_eq!(sink.messages(), vec![OscMessage::float("/lr/mix/fader", 0.7)]);
    }
}
