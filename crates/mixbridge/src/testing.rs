//! Test doubles shared by the unit tests

use mixproto::OscMessage;
use std::sync::Mutex;
use tokio::time::Instant;

use crate::transport::MixerSink;

/// Records every outbound message with the (tokio) time it was sent
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Instant, OscMessage)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OscMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn timed(&self) -> Vec<(Instant, OscMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OscMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.address == address)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl MixerSink for RecordingSink {
    fn send(&self, message: &OscMessage) {
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), message.clone()));
    }
}
