//! Transport, probe and bridge against a fake mixer on loopback UDP

mod common;

use common::{loopback, FakeMixer};
use mixbridge::bus::InboundBus;
use mixbridge::probe::{run_probe, ProbeConfig};
use mixbridge::transport::Transport;
use mixbridge::{Bridge, BridgeError};
use mixconf::TimingConfig;
use mixproto::{ClientRequest, OscArg, OscMessage, ProtocolValue, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

async fn connect(mixer: &FakeMixer) -> (Arc<Transport>, InboundBus, CancellationToken) {
    let transport = Arc::new(Transport::bind(loopback(), mixer.addr).await.unwrap());
    let bus = InboundBus::default();
    let cancel = CancellationToken::new();
    (transport, bus, cancel)
}

#[tokio::test]
async fn probe_succeeds_against_answering_mixer() {
    let mixer = FakeMixer::start(false).await;
    let (transport, bus, cancel) = connect(&mixer).await;
    let rx = bus.subscribe();
    let opened_at = Instant::now();
    let _reader = transport.spawn_reader(bus.clone(), cancel.clone());

    let outcome = run_probe(transport.as_ref(), rx, opened_at, &ProbeConfig::default())
        .await
        .unwrap();

    assert_eq!(outcome.address, "/status");
    assert!(outcome.elapsed < Duration::from_millis(1200));
    cancel.cancel();
}

#[tokio::test]
async fn probe_fails_against_silent_mixer() {
    let mixer = FakeMixer::start(true).await;
    let (transport, bus, cancel) = connect(&mixer).await;
    let rx = bus.subscribe();
    let opened_at = Instant::now();
    let _reader = transport.spawn_reader(bus.clone(), cancel.clone());

    let config = ProbeConfig {
        stagger: Duration::from_millis(20),
        deadline: Duration::from_millis(200),
    };
    let result = run_probe(transport.as_ref(), rx, opened_at, &config).await;

    assert!(matches!(result, Err(BridgeError::MixerUnreachable { .. })));
    assert!(opened_at.elapsed() >= Duration::from_millis(200));
    assert_eq!(mixer.queries_for("/status"), 1);
    assert_eq!(mixer.queries_for("/info"), 1);
    assert_eq!(mixer.queries_for("/ch/01/mix/fader"), 1);
    cancel.cancel();
}

#[tokio::test]
async fn bridge_round_trip_over_udp() {
    let mut mixer = FakeMixer::start(false).await;
    mixer.set_value("/ch/01/mix/fader", OscArg::Float(0.75));
    mixer.set_value("/ch/01/config/color", OscArg::Int(2));

    let (transport, bus, cancel) = connect(&mixer).await;
    let reader = transport.spawn_reader(bus.clone(), cancel.clone());
    let bridge = Bridge::new(
        transport.clone(),
        bus,
        &TimingConfig::default(),
        mixer.addr.to_string(),
        cancel.clone(),
    );
    let tasks = bridge.start();
    let (id, mut events) = bridge.sessions.connect();

    // Subscribe: the mixer's answer arrives as a snapshot
    bridge.sessions.handle(
        id,
        ClientRequest::Subscribe {
            address: "/ch/01/mix/fader".into(),
        },
    );
    let snapshot = loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, ServerEvent::Snapshot { .. }) {
            break event;
        }
    };
    assert_eq!(
        snapshot,
        ServerEvent::snapshot_of("/ch/01/mix/fader", ProtocolValue::Number(0.75))
    );

    // Unsolicited mixer change reaches the subscriber
    mixer
        .push(OscMessage::float("/ch/01/mix/fader", 0.5))
        .await;
    let update = loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        if let ServerEvent::LiveUpdate { value, .. } = event {
            if value == 0.5 {
                break event;
            }
        }
    };
    assert_eq!(
        update,
        ServerEvent::LiveUpdate {
            address: "/ch/01/mix/fader".into(),
            value: 0.5
        }
    );

    // A burst of writes lands as one datagram with the last value
    for v in [0.1, 0.2, 0.3, 0.4] {
        bridge.sessions.handle(
            id,
            ClientRequest::Write {
                address: "/lr/mix/fader".into(),
                value: v,
            },
        );
    }
    let write = timeout(Duration::from_secs(2), mixer.writes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(write, OscMessage::float("/lr/mix/fader", 0.4));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(mixer.writes.try_recv().is_err());

    // Color lookup
    bridge.sessions.handle(
        id,
        ClientRequest::QueryColor {
            color_address: "/ch/01/config/color".into(),
        },
    );
    let color = loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, ServerEvent::ColorResponse { .. }) {
            break event;
        }
    };
    assert_eq!(
        color,
        ServerEvent::ColorResponse {
            color_address: "/ch/01/config/color".into(),
            color: Some(2),
        }
    );

    bridge.sessions.disconnect(id);
    cancel.cancel();
    for task in tasks {
        task.await.unwrap();
    }
    reader.await.unwrap();
}
