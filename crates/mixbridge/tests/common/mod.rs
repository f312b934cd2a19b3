//! A fake X-Air console on a loopback UDP socket

#![allow(dead_code)]

use mixproto::{OscArg, OscMessage};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub fn loopback() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

/// Answers queries from a value table and reports every write it receives
pub struct FakeMixer {
    pub addr: SocketAddr,
    socket: Arc<UdpSocket>,
    values: Arc<Mutex<HashMap<String, OscArg>>>,
    peer: Arc<Mutex<Option<SocketAddr>>>,
    pub writes: mpsc::UnboundedReceiver<OscMessage>,
    pub queries: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeMixer {
    /// `silent` mixers record traffic but never answer
    pub async fn start(silent: bool) -> Self {
        let socket = Arc::new(UdpSocket::bind(loopback()).await.unwrap());
        let addr = socket.local_addr().unwrap();
        let values: Arc<Mutex<HashMap<String, OscArg>>> = Arc::new(Mutex::new(HashMap::new()));
        let peer = Arc::new(Mutex::new(None));
        let queries = Arc::new(Mutex::new(Vec::new()));
        let (write_tx, writes) = mpsc::unbounded_channel();

        let task = tokio::spawn({
            let socket = Arc::clone(&socket);
            let values = Arc::clone(&values);
            let peer = Arc::clone(&peer);
            let queries = Arc::clone(&queries);
            async move {
                let mut buf = vec![0u8; 65_535];
                loop {
                    let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                        break;
                    };
                    *peer.lock().unwrap() = Some(from);
                    let Ok(message) = OscMessage::decode(&buf[..len]) else {
                        continue;
                    };

                    if !message.args.is_empty() {
                        if let Some(arg) = message.first_arg() {
                            values
                                .lock()
                                .unwrap()
                                .insert(message.address.clone(), arg.clone());
                        }
                        let _ = write_tx.send(message);
                        continue;
                    }

                    queries.lock().unwrap().push(message.address.clone());
                    if silent {
                        continue;
                    }

                    let reply = match message.address.as_str() {
                        "/status" => Some(OscMessage::new(
                            "/status",
                            vec![
                                OscArg::Str("active".into()),
                                OscArg::Str("127.0.0.1".into()),
                                OscArg::Str("XR18-FAKE".into()),
                            ],
                        )),
                        "/xremote" => None,
                        address => values
                            .lock()
                            .unwrap()
                            .get(address)
                            .map(|arg| OscMessage::new(address, vec![arg.clone()])),
                    };
                    if let Some(reply) = reply {
                        let _ = socket.send_to(&reply.encode(), from).await;
                    }
                }
            }
        });

        Self {
            addr,
            socket,
            values,
            peer,
            writes,
            queries,
            task,
        }
    }

    pub fn set_value(&self, address: &str, arg: OscArg) {
        self.values.lock().unwrap().insert(address.to_string(), arg);
    }

    /// Push an unsolicited update to whoever talked to us last
    pub async fn push(&self, message: OscMessage) {
        let peer = (*self.peer.lock().unwrap()).expect("no peer yet");
        self.socket.send_to(&message.encode(), peer).await.unwrap();
    }

    pub fn queries_for(&self, address: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == address)
            .count()
    }
}

impl Drop for FakeMixer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
