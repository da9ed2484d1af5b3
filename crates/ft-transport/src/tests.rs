//! Unit tests for ft-transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ft_bus::{EngineBus, CONNECT, DISCONNECT, RECONNECT_FAILED};
use ft_core::TransportConfig;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{
    Channel, ConnectionState, Connector, TransportClient, TransportError, TransportResult,
};

// ── Mock channel ──────────────────────────────────────────────────────────────

/// What the next connect attempt does.
#[derive(Copy, Clone, Debug)]
enum Outcome {
    Accept,
    Fail,
    Hang,
}

/// The far end of an accepted mock connection.  Dropping it closes the
/// channel from the server side.
struct Server {
    outbound: mpsc::UnboundedReceiver<String>,
    inbound:  mpsc::UnboundedSender<String>,
}

impl Server {
    fn push(&self, frame: &str) {
        self.inbound.send(frame.to_owned()).unwrap();
    }

    fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            out.push(frame);
        }
        out
    }
}

struct MockChannel {
    to_server:   mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Channel for MockChannel {
    async fn send(&mut self, frame: &str) -> TransportResult<()> {
        self.to_server.send(frame.to_owned()).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> TransportResult<Option<String>> {
        Ok(self.from_server.recv().await)
    }

    async fn close(&mut self) {
        self.from_server.close();
    }
}

#[derive(Clone)]
struct MockConnector {
    script:   Arc<Mutex<VecDeque<Outcome>>>,
    fallback: Outcome,
    attempts: Arc<Mutex<Vec<Instant>>>,
    servers:  mpsc::UnboundedSender<Server>,
}

impl MockConnector {
    fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Channel = MockChannel;

    async fn connect(&self) -> TransportResult<MockChannel> {
        self.attempts.lock().unwrap().push(Instant::now());
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match outcome {
            Outcome::Accept => {
                let (to_server, outbound) = mpsc::unbounded_channel();
                let (inbound, from_server) = mpsc::unbounded_channel();
                self.servers.send(Server { outbound, inbound }).unwrap();
                Ok(MockChannel { to_server, from_server })
            }
            Outcome::Fail => Err(TransportError::Connect("connection refused".into())),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

struct Harness {
    client:  TransportClient,
    conn:    MockConnector,
    servers: mpsc::UnboundedReceiver<Server>,
    bus:     EngineBus,
    events:  Arc<Mutex<Vec<&'static str>>>,
}

impl Harness {
    fn new(config: TransportConfig, script: Vec<Outcome>, fallback: Outcome) -> Self {
        let (servers_tx, servers) = mpsc::unbounded_channel();
        let conn = MockConnector {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            attempts: Arc::new(Mutex::new(Vec::new())),
            servers: servers_tx,
        };
        let bus = EngineBus::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        for name in [CONNECT, DISCONNECT, RECONNECT_FAILED] {
            let events = Arc::clone(&events);
            bus.on(name, move |_| {
                events.lock().unwrap().push(name);
                Ok(())
            });
        }
        let client = TransportClient::start(config, conn.clone(), bus.clone()).unwrap();
        Self { client, conn, servers, bus, events }
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    async fn wait_for(&self, state: ConnectionState) {
        let mut rx = self.client.watch_state();
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    /// Connect, accept, and return the server end once the client is open.
    async fn open(&mut self) -> Server {
        self.client.connect();
        let server = self.servers.recv().await.unwrap();
        self.wait_for(ConnectionState::Open).await;
        settle().await;
        server
    }
}

/// Let the actor drain its queue.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn sub(topic: &str) -> String {
    format!(r#"{{"type":"subscribe","topic":"{topic}"}}"#)
}

fn unsub(topic: &str) -> String {
    format!(r#"{{"type":"unsubscribe","topic":"{topic}"}}"#)
}

fn assert_gap(a: Instant, b: Instant, expected: Duration) {
    let gap = b - a;
    assert!(
        gap >= expected && gap <= expected + Duration::from_millis(5),
        "gap {gap:?}, expected {expected:?}"
    );
}

// ── Backoff ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod backoff {
    use super::*;
    use crate::Backoff;

    #[test]
    fn delays_double_then_cap() {
        let b = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 10);
        let delays: Vec<u64> = (0..8).map(|n| b.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn delays_are_monotonic_and_never_exceed_max() {
        let max = Duration::from_millis(7_500);
        let b = Backoff::new(Duration::from_millis(300), max, 100);
        let mut prev = Duration::ZERO;
        for n in 0..100 {
            let d = b.delay_for(n);
            assert!(d >= prev);
            assert!(d <= max);
            prev = d;
        }
    }

    #[test]
    fn budget_is_spent_then_reset() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(30), 3);
        assert_eq!(b.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(b.next_delay(), Some(Duration::from_secs(4)));
        assert!(b.exhausted());
        assert_eq!(b.next_delay(), None);
        assert_eq!(b.attempt(), 3);

        b.reset();
        assert_eq!(b.attempt(), 0);
        assert_eq!(b.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(1), 0);
        assert_eq!(b.next_delay(), None);
    }
}

// ── Protocol ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod protocol {
    use serde_json::json;

    use crate::{Inbound, Outbound};

    #[test]
    fn outbound_shapes() {
        assert_eq!(
            Outbound::subscribe("vehicles").to_json().unwrap(),
            r#"{"type":"subscribe","topic":"vehicles"}"#
        );
        assert_eq!(
            Outbound::unsubscribe("alerts").to_json().unwrap(),
            r#"{"type":"unsubscribe","topic":"alerts"}"#
        );
        assert_eq!(Outbound::Ping.to_json().unwrap(), r#"{"type":"ping"}"#);

        let serde_json::Value::Object(data) = json!({ "speed": 42 }) else { unreachable!() };
        let untopiced = Outbound::Publish { topic: None, data: data.clone() };
        assert_eq!(untopiced.to_json().unwrap(), r#"{"type":"publish","data":{"speed":42}}"#);
        let topiced = Outbound::Publish { topic: Some("alerts".into()), data };
        assert_eq!(
            topiced.to_json().unwrap(),
            r#"{"type":"publish","topic":"alerts","data":{"speed":42}}"#
        );
    }

    #[test]
    fn inbound_heartbeats() {
        assert_eq!(
            Inbound::parse(r#"{"type":"pong","timestamp":1700000000.5}"#).unwrap(),
            Inbound::Pong { timestamp: Some(1_700_000_000.5) }
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"pong"}"#).unwrap(),
            Inbound::Pong { timestamp: None }
        );
        let ping = Inbound::parse(r#"{"type":"ping","timestamp":"2024-01-01T00:00:00"}"#).unwrap();
        assert_eq!(ping, Inbound::Ping);
        assert!(ping.is_heartbeat());
    }

    #[test]
    fn inbound_data() {
        let msg = Inbound::parse(r#"{"type":"alert","topic":"alerts","data":{"id":"A1"}}"#).unwrap();
        let Inbound::Data(m) = msg else { panic!("not data: {msg:?}") };
        assert_eq!(m.kind, "alert");
        assert_eq!(m.topic.as_deref(), Some("alerts"));
        assert_eq!(m.data["id"], "A1");

        let no_topic = Inbound::parse(r#"{"type":"vehicle_update","data":{}}"#).unwrap();
        assert!(matches!(no_topic, Inbound::Data(ref m) if m.topic.is_none()));
        assert!(!no_topic.is_heartbeat());
    }

    #[test]
    fn inbound_rejects_malformed() {
        for bad in [
            "not json",
            "[1,2,3]",
            r#"{"data":{}}"#,
            r#"{"type":"","data":{}}"#,
            r#"{"type":"alert"}"#,
            r#"{"type":"alert","data":5}"#,
            r#"{"type":"alert","data":[1]}"#,
            r#"{"type":7,"data":{}}"#,
            r#"{"type":"disconnect","data":{}}"#,
            r#"{"type":"roster","data":{}}"#,
            r#"{"type":"topic:alerts","data":{}}"#,
        ] {
            assert!(Inbound::parse(bad).is_err(), "accepted {bad}");
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod client {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ft_bus::topic_event;
    use serde_json::json;

    use super::*;
    use crate::Outbound;

    fn quick() -> TransportConfig {
        TransportConfig { base_delay_ms: 1_000, max_delay_ms: 3_000, ..TransportConfig::default() }
    }

    #[test]
    fn start_needs_a_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = MockConnector {
            script:   Arc::new(Mutex::new(VecDeque::new())),
            fallback: Outcome::Fail,
            attempts: Arc::new(Mutex::new(Vec::new())),
            servers:  tx,
        };
        let res = TransportClient::start(TransportConfig::default(), conn, EngineBus::new());
        assert!(matches!(res, Err(TransportError::NoRuntime)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = MockConnector {
            script:   Arc::new(Mutex::new(VecDeque::new())),
            fallback: Outcome::Fail,
            attempts: Arc::new(Mutex::new(Vec::new())),
            servers:  tx,
        };
        let cfg = TransportConfig { base_delay_ms: 10, max_delay_ms: 1, ..TransportConfig::default() };
        let res = TransportClient::start(cfg, conn, EngineBus::new());
        assert!(matches!(res, Err(TransportError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn subscriptions_replay_on_connect_and_are_idempotent() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        assert_eq!(h.client.state(), ConnectionState::Closed);
        h.client.subscribe("vehicles");
        h.client.subscribe("vehicles");
        h.client.subscribe("alerts");

        let mut server = h.open().await;
        assert_eq!(server.drain(), vec![sub("alerts"), sub("vehicles")]);
        assert_eq!(h.events(), vec![CONNECT]);

        h.client.subscribe("vehicles");
        settle().await;
        assert!(server.drain().is_empty());

        h.client.subscribe("drivers");
        settle().await;
        assert_eq!(server.drain(), vec![sub("drivers")]);

        h.client.unsubscribe("drivers");
        h.client.unsubscribe("drivers");
        settle().await;
        assert_eq!(server.drain(), vec![unsub("drivers")]);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_resubscribes_exactly_once() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        h.client.subscribe("vehicles");
        h.client.subscribe("alerts");
        let mut first = h.open().await;
        assert_eq!(first.drain().len(), 2);

        drop(first);
        let mut second = h.servers.recv().await.unwrap();
        h.wait_for(ConnectionState::Open).await;
        settle().await;

        assert_eq!(second.drain(), vec![sub("alerts"), sub("vehicles")]);
        assert_eq!(h.events(), vec![CONNECT, DISCONNECT, CONNECT]);
        let attempts = h.conn.attempts();
        assert_eq!(attempts.len(), 2);
        assert_gap(attempts[0], attempts[1], Duration::from_secs(1));

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget_with_capped_delays() {
        let cfg = TransportConfig { max_attempts: 4, ..quick() };
        let h = Harness::new(cfg, vec![], Outcome::Fail);
        h.client.connect();
        h.wait_for(ConnectionState::Failed).await;

        let attempts = h.conn.attempts();
        assert_eq!(attempts.len(), 5);
        let expected = [1, 2, 3, 3].map(Duration::from_secs);
        for (pair, want) in attempts.windows(2).zip(expected) {
            assert_gap(pair[0], pair[1], want);
        }
        let mut expected_events = vec![DISCONNECT; 5];
        expected_events.push(RECONNECT_FAILED);
        assert_eq!(h.events(), expected_events);

        // Stays down on its own.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.conn.attempts().len(), 5);
        assert_eq!(h.client.state(), ConnectionState::Failed);

        // An explicit connect starts over.
        h.client.connect();
        settle().await;
        assert_eq!(h.conn.attempts().len(), 6);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refused_attempt_announces_disconnect_then_recovers() {
        let mut h = Harness::new(quick(), vec![Outcome::Fail], Outcome::Accept);
        h.client.connect();
        settle().await;
        assert_eq!(h.client.state(), ConnectionState::Closed);
        assert_eq!(h.events(), vec![DISCONNECT]);

        let _server = h.servers.recv().await.unwrap();
        h.wait_for(ConnectionState::Open).await;
        settle().await;
        assert_eq!(h.events(), vec![DISCONNECT, CONNECT]);
        let attempts = h.conn.attempts();
        assert_gap(attempts[0], attempts[1], Duration::from_secs(1));

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_connect_times_out_and_retries() {
        let cfg = TransportConfig { connect_timeout_ms: 10_000, ..quick() };
        let mut h = Harness::new(cfg, vec![Outcome::Hang], Outcome::Accept);
        let _server = h.open().await;

        let attempts = h.conn.attempts();
        assert_eq!(attempts.len(), 2);
        assert_gap(attempts[0], attempts[1], Duration::from_secs(11));
        // The timed-out attempt counts as a drop.
        assert_eq!(h.events(), vec![DISCONNECT, CONNECT]);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_open_is_a_no_op() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        let _server = h.open().await;
        h.client.connect();
        h.client.connect();
        settle().await;
        assert_eq!(h.conn.attempts().len(), 1);
        assert_eq!(h.client.state(), ConnectionState::Open);
        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_pings_while_open() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        let mut server = h.open().await;
        server.drain();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(server.drain().is_empty());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(server.drain(), vec![r#"{"type":"ping"}"#.to_owned()]);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_keep_a_quiet_peer_alive() {
        let cfg = TransportConfig { liveness_timeout_ms: Some(5_000), ..quick() };
        let mut h = Harness::new(cfg, vec![], Outcome::Accept);
        let server = h.open().await;

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_secs(3)).await;
            server.push(r#"{"type":"pong","timestamp":1}"#);
        }
        settle().await;
        assert_eq!(h.client.state(), ConnectionState::Open);
        assert_eq!(h.events(), vec![CONNECT]);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_is_dropped() {
        let cfg = TransportConfig { liveness_timeout_ms: Some(5_000), ..quick() };
        let mut h = Harness::new(cfg, vec![], Outcome::Accept);
        let _server = h.open().await;
        let opened = Instant::now();

        let mut rx = h.client.watch_state();
        rx.wait_for(|s| *s != ConnectionState::Open).await.unwrap();
        assert_gap(opened, Instant::now(), Duration::from_secs(5) - Duration::from_millis(1));
        assert_eq!(h.events(), vec![CONNECT, DISCONNECT]);

        // And it comes back.
        let _again = h.servers.recv().await.unwrap();
        h.wait_for(ConnectionState::Open).await;

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_only_while_open() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        assert!(!h.client.send(&Outbound::Ping));

        let mut server = h.open().await;
        server.drain();

        let serde_json::Value::Object(data) = json!({ "id": 1 }) else { unreachable!() };
        assert!(h.client.publish(Some("alerts"), data));
        settle().await;
        assert_eq!(
            server.drain(),
            vec![r#"{"type":"publish","topic":"alerts","data":{"id":1}}"#.to_owned()]
        );

        h.client.disconnect();
        h.wait_for(ConnectionState::Closed).await;
        assert!(!h.client.send(&Outbound::Ping));

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_dispatch_drops_malformed_and_hides_heartbeats() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        let counter = |name: String| {
            let n = Arc::new(AtomicUsize::new(0));
            let n2 = Arc::clone(&n);
            h.bus.on(name, move |_| {
                n2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            n
        };
        let by_kind = counter("alert".into());
        let by_topic = counter(topic_event("alerts"));
        let pongs = counter("pong".into());
        let pings = counter("ping".into());

        let server = h.open().await;
        for frame in [
            "not json",
            r#"{"type":"alert","data":5}"#,
            r#"{"data":{"id":1}}"#,
            r#"{"type":"pong","timestamp":1}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"mystery","data":{}}"#,
            r#"{"type":"disconnect","data":{}}"#,
            r#"{"type":"alert","topic":"alerts","data":{"id":"A1"}}"#,
        ] {
            server.push(frame);
        }
        settle().await;

        assert_eq!(by_kind.load(Ordering::SeqCst), 1);
        assert_eq!(by_topic.load(Ordering::SeqCst), 1);
        assert_eq!(pongs.load(Ordering::SeqCst), 0);
        assert_eq!(pings.load(Ordering::SeqCst), 0);
        assert_eq!(h.client.state(), ConnectionState::Open);
        assert_eq!(h.events(), vec![CONNECT]);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_reconnecting() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        let _server = h.open().await;

        h.client.disconnect();
        h.wait_for(ConnectionState::Closed).await;
        assert_eq!(h.events(), vec![CONNECT, DISCONNECT]);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.conn.attempts().len(), 1);
        assert_eq!(h.client.state(), ConnectionState::Closed);

        // Explicit connect works again.
        let _server = h.open().await;
        assert_eq!(h.conn.attempts().len(), 2);

        h.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_without_announcing() {
        let mut h = Harness::new(quick(), vec![], Outcome::Accept);
        let mut server = h.open().await;
        h.client.shutdown().await;
        // The channel is gone: the server end sees the sender dropped.
        assert!(server.outbound.recv().await.is_none());
        assert_eq!(h.events.lock().unwrap().as_slice(), &[CONNECT]);
    }
}
