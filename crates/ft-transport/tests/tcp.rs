//! End-to-end against a real TCP listener.

use std::time::Duration;

use ft_bus::{topic_event, topics, EngineBus, CONNECT};
use ft_core::TransportConfig;
use ft_transport::{ConnectionState, TcpConnector, TransportClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn subscribe_receive_and_shutdown_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let bus = EngineBus::new();
    let (got_tx, mut got_rx) = mpsc::unbounded_channel();
    bus.on(topic_event(topics::VEHICLES), move |ev| {
        let msg = ev.as_message().unwrap();
        got_tx.send((msg.kind.clone(), msg.data["id"].clone())).unwrap();
        Ok(())
    });
    let (up_tx, mut up_rx) = mpsc::unbounded_channel();
    bus.on(CONNECT, move |_| {
        let _ = up_tx.send(());
        Ok(())
    });

    let client = TransportClient::start(
        TransportConfig::default(),
        TcpConnector::new(addr.to_string()),
        bus.clone(),
    )
    .unwrap();
    client.subscribe(topics::VEHICLES);
    client.connect();

    let (stream, _) = timeout(LIMIT, listener.accept()).await.unwrap().unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    let first = timeout(LIMIT, lines.next_line()).await.unwrap().unwrap().unwrap();
    assert_eq!(first, r#"{"type":"subscribe","topic":"vehicles"}"#);
    timeout(LIMIT, up_rx.recv()).await.unwrap().unwrap();
    assert_eq!(client.state(), ConnectionState::Open);

    write
        .write_all(b"{\"type\":\"vehicle_update\",\"topic\":\"vehicles\",\"data\":{\"id\":\"V001\"}}\n")
        .await
        .unwrap();
    let (kind, id) = timeout(LIMIT, got_rx.recv()).await.unwrap().unwrap();
    assert_eq!(kind, "vehicle_update");
    assert_eq!(id, "V001");

    client.shutdown().await;
    // The client closed its side: the server reads EOF.
    let eof = timeout(LIMIT, lines.next_line()).await.unwrap().unwrap();
    assert!(eof.is_none());
}

#[tokio::test]
async fn refused_connection_schedules_reconnect() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let cfg = TransportConfig { base_delay_ms: 10_000, max_delay_ms: 10_000, ..TransportConfig::default() };
    let client = TransportClient::start(cfg, TcpConnector::new(addr.to_string()), EngineBus::new())
        .unwrap();
    let mut state = client.watch_state();
    state.borrow_and_update();
    client.connect();

    // Leaves Closed, then comes back to it once the attempt is refused.
    timeout(LIMIT, state.changed()).await.unwrap().unwrap();
    timeout(LIMIT, state.wait_for(|s| *s == ConnectionState::Closed))
        .await
        .unwrap()
        .unwrap();
    assert!(!client.send(&ft_transport::Outbound::Ping));

    client.shutdown().await;
}
