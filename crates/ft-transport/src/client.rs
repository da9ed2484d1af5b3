//! `TransportClient` — the reconnecting subscription client.
//!
//! # Actor
//!
//! One tokio task owns the channel, the timers and the topic set.  The
//! [`TransportClient`] handle feeds it commands over an unbounded `mpsc`
//! queue and reads its state from a `watch` channel.  Everything the actor
//! waits on is raced in a single `select!`:
//!
//! ```text
//! command      → connect / disconnect / (un)subscribe / send / shutdown
//! connect done → Open: reset backoff, replay topics, emit `connect`
//! frame        → heartbeat: note liveness | data: publish | EOF/err: lost
//! liveness     → nothing heard for liveness_timeout: lost
//! keepalive    → send {"type":"ping"}
//! reconnect    → start the next connect attempt
//! ```
//!
//! A lost channel or a failed attempt emits `disconnect`, then schedules a
//! reconnect after `min(base * 2^n, max)`.  When the attempt budget is spent
//! the client emits `reconnect_failed`, enters [`ConnectionState::Failed`]
//! and waits for an explicit [`TransportClient::connect`].

use std::collections::BTreeSet;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;

use ft_bus::{ConnectionEvent, EngineBus, EngineEvent};
use ft_core::TransportConfig;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};

use crate::{Backoff, Channel, Connector, Inbound, Outbound, TransportError, TransportResult};

/// Where the connection stands.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConnectionState {
    /// Not connected.  A reconnect may be pending.
    Closed,
    Connecting,
    Open,
    /// Reconnect budget spent.  Only [`TransportClient::connect`] leaves
    /// this state.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Closed     => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open       => "open",
            ConnectionState::Failed     => "failed",
        })
    }
}

enum Command {
    Connect,
    Disconnect,
    Subscribe(String),
    Unsubscribe(String),
    Send(String),
    Shutdown,
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Handle to a running transport actor.
///
/// Created with [`start`][Self::start], torn down with
/// [`shutdown`][Self::shutdown].  Dropping the handle also stops the actor,
/// without waiting for it.
pub struct TransportClient {
    cmd_tx:   mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    task:     JoinHandle<()>,
}

impl TransportClient {
    /// Spawn the actor on the current tokio runtime.  The client starts
    /// [`Closed`][ConnectionState::Closed]; call [`connect`][Self::connect].
    pub fn start<C: Connector>(
        config:    TransportConfig,
        connector: C,
        bus:       EngineBus,
    ) -> TransportResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);

        let actor = Actor {
            backoff: Backoff::from_config(&config),
            config,
            connector: Arc::new(connector),
            bus,
            state_tx,
            cmd_rx,
            topics: BTreeSet::new(),
            channel: None,
            pending: None,
            reconnect_at: None,
            next_ping: None,
            last_heard: Instant::now(),
            auto_reconnect: false,
        };
        let task = runtime.spawn(actor.run());

        Ok(Self { cmd_tx, state_rx, task })
    }

    /// Open the connection.  No-op while connecting or open.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Add `topic` to the subscription set.  Sent immediately when open,
    /// replayed on every later connection.  Idempotent.
    pub fn subscribe(&self, topic: impl Into<String>) {
        self.command(Command::Subscribe(topic.into()));
    }

    /// Remove `topic` from the subscription set.  Idempotent.
    pub fn unsubscribe(&self, topic: impl Into<String>) {
        self.command(Command::Unsubscribe(topic.into()));
    }

    /// Send `message` if the connection is open.  Never queues: returns
    /// `false` when it is not.
    pub fn send(&self, message: &Outbound) -> bool {
        if self.state() != ConnectionState::Open {
            return false;
        }
        match message.to_json() {
            Ok(frame) => self.cmd_tx.send(Command::Send(frame)).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "could not encode outbound message");
                false
            }
        }
    }

    /// `send` a `publish` message.
    pub fn publish(&self, topic: Option<&str>, data: Map<String, Value>) -> bool {
        self.send(&Outbound::Publish { topic: topic.map(str::to_owned), data })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Close the connection, stop every timer and wait for the actor to end.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "transport task ended abnormally");
        }
    }

    fn command(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::debug!("transport task is gone, command dropped");
        }
    }
}

// ── Actor ─────────────────────────────────────────────────────────────────────

type ConnectFuture<Ch> = Pin<Box<dyn Future<Output = TransportResult<Ch>> + Send>>;

struct Actor<C: Connector> {
    config:         TransportConfig,
    connector:      Arc<C>,
    bus:            EngineBus,
    state_tx:       watch::Sender<ConnectionState>,
    cmd_rx:         mpsc::UnboundedReceiver<Command>,
    /// Ordered so replays are deterministic.
    topics:         BTreeSet<String>,
    channel:        Option<C::Channel>,
    pending:        Option<ConnectFuture<C::Channel>>,
    reconnect_at:   Option<Instant>,
    next_ping:      Option<Instant>,
    last_heard:     Instant,
    backoff:        Backoff,
    /// Cleared by `disconnect`; a lost channel only reconnects while set.
    auto_reconnect: bool,
}

impl<C: Connector> Actor<C> {
    async fn run(mut self) {
        loop {
            let liveness = self.liveness_deadline();
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.on_command(cmd).await,
                },
                result = poll_connect(&mut self.pending) => {
                    self.pending = None;
                    self.on_connect_result(result).await;
                }
                frame = recv_frame(&mut self.channel) => self.on_frame(frame).await,
                _ = sleep_opt(liveness) => {
                    tracing::warn!(timeout = ?self.config.liveness_timeout(), "peer silent, dropping connection");
                    self.on_lost().await;
                }
                _ = sleep_opt(self.next_ping) => self.keepalive().await,
                _ = sleep_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.start_connect();
                }
            }
        }

        self.close(false).await;
        tracing::debug!("transport task stopped");
    }

    // ── Commands ──────────────────────────────────────────────────────────

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => {
                if matches!(self.state(), ConnectionState::Connecting | ConnectionState::Open) {
                    return;
                }
                self.auto_reconnect = true;
                self.backoff.reset();
                self.start_connect();
            }
            Command::Disconnect => {
                self.auto_reconnect = false;
                self.close(true).await;
            }
            Command::Subscribe(topic) => {
                if self.topics.insert(topic.clone()) {
                    self.send_if_open(&Outbound::subscribe(topic)).await;
                }
            }
            Command::Unsubscribe(topic) => {
                if self.topics.remove(&topic) {
                    self.send_if_open(&Outbound::unsubscribe(topic)).await;
                }
            }
            Command::Send(frame) => {
                if self.channel.is_some() {
                    self.write(&frame).await;
                }
            }
            Command::Shutdown => {}
        }
    }

    // ── Connection lifecycle ──────────────────────────────────────────────

    fn start_connect(&mut self) {
        let connector = Arc::clone(&self.connector);
        let limit = self.config.connect_timeout();
        self.pending = Some(Box::pin(async move {
            match timeout(limit, connector.connect()).await {
                Ok(result) => result,
                Err(_)     => Err(TransportError::ConnectTimeout(limit)),
            }
        }));
        self.reconnect_at = None;
        self.set_state(ConnectionState::Connecting);
        tracing::debug!(attempt = self.backoff.attempt(), "connecting");
    }

    async fn on_connect_result(&mut self, result: TransportResult<C::Channel>) {
        match result {
            Ok(channel) => {
                self.channel = Some(channel);
                self.backoff.reset();
                let now = Instant::now();
                self.last_heard = now;
                self.next_ping = Some(now + self.config.keepalive_interval());
                self.set_state(ConnectionState::Open);
                tracing::info!(topics = self.topics.len(), "transport connected");

                let topics: Vec<String> = self.topics.iter().cloned().collect();
                for topic in topics {
                    if !self.send_if_open(&Outbound::subscribe(topic)).await {
                        return;
                    }
                }
                self.bus.publish(EngineEvent::Connection(ConnectionEvent::Connect));
            }
            Err(e) => {
                tracing::warn!(error = %e, "connect attempt failed");
                self.set_state(ConnectionState::Closed);
                self.bus.publish(EngineEvent::Connection(ConnectionEvent::Disconnect));
                self.schedule_reconnect();
            }
        }
    }

    /// The open channel failed or went quiet.
    async fn on_lost(&mut self) {
        self.drop_channel().await;
        self.set_state(ConnectionState::Closed);
        self.bus.publish(EngineEvent::Connection(ConnectionEvent::Disconnect));
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect {
            return;
        }
        match self.backoff.next_delay() {
            Some(delay) => {
                tracing::debug!(?delay, attempt = self.backoff.attempt(), "reconnect scheduled");
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => {
                tracing::error!(attempts = self.backoff.attempt(), "reconnect attempts exhausted");
                self.auto_reconnect = false;
                self.set_state(ConnectionState::Failed);
                self.bus.publish(EngineEvent::Connection(ConnectionEvent::ReconnectFailed));
            }
        }
    }

    /// Cancel timers and any attempt in flight, close the channel.
    async fn close(&mut self, announce: bool) {
        self.pending = None;
        self.reconnect_at = None;
        let was_open = self.channel.is_some();
        self.drop_channel().await;
        if self.state() != ConnectionState::Failed {
            self.set_state(ConnectionState::Closed);
        }
        if was_open && announce {
            self.bus.publish(EngineEvent::Connection(ConnectionEvent::Disconnect));
        }
    }

    async fn drop_channel(&mut self) {
        self.next_ping = None;
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }

    // ── Traffic ───────────────────────────────────────────────────────────

    async fn on_frame(&mut self, frame: TransportResult<Option<String>>) {
        let text = match frame {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!("peer closed the connection");
                return self.on_lost().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "receive failed");
                return self.on_lost().await;
            }
        };
        self.last_heard = Instant::now();

        match Inbound::parse(&text) {
            Ok(Inbound::Data(message)) => {
                tracing::trace!(kind = %message.kind, topic = ?message.topic, "data message");
                self.bus.publish(EngineEvent::Message(message));
            }
            Ok(heartbeat) => tracing::trace!(?heartbeat, "heartbeat"),
            Err(e) => tracing::warn!(error = %e, "dropping malformed message"),
        }
    }

    async fn keepalive(&mut self) {
        self.next_ping = Some(Instant::now() + self.config.keepalive_interval());
        self.send_if_open(&Outbound::Ping).await;
    }

    /// Returns `false` if the write failed and the channel was dropped.
    async fn send_if_open(&mut self, message: &Outbound) -> bool {
        if self.channel.is_none() {
            return true;
        }
        match message.to_json() {
            Ok(frame) => self.write(&frame).await,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode outbound message");
                true
            }
        }
    }

    async fn write(&mut self, frame: &str) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return true;
        };
        match channel.send(frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                self.on_lost().await;
                false
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let old = self.state_tx.send_replace(state);
        if old != state {
            tracing::debug!(from = %old, to = %state, "transport state");
        }
    }

    fn liveness_deadline(&self) -> Option<Instant> {
        self.channel.as_ref()?;
        Some(self.last_heard + self.config.liveness_timeout()?)
    }
}

async fn poll_connect<Ch>(attempt: &mut Option<ConnectFuture<Ch>>) -> TransportResult<Ch> {
    match attempt {
        Some(fut) => fut.as_mut().await,
        None      => pending_forever().await,
    }
}

async fn recv_frame<Ch: Channel>(channel: &mut Option<Ch>) -> TransportResult<Option<String>> {
    match channel {
        Some(ch) => ch.recv().await,
        None     => pending_forever().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None     => pending_forever().await,
    }
}

async fn pending_forever<T>() -> T {
    pending().await
}
