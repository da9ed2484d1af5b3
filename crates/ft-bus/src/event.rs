//! The engine's event payload and the names it is published under.

use ft_core::RosterUpdate;
use serde_json::{Map, Value};

use crate::{Delivery, EventBus};

// ── Event names ───────────────────────────────────────────────────────────────

pub const CONNECT: &str = "connect";
pub const DISCONNECT: &str = "disconnect";
pub const RECONNECT_FAILED: &str = "reconnect_failed";
pub const ROSTER: &str = "roster";

/// Prefix of topic-scoped event names: data on topic `alerts` is also
/// published as `topic:alerts`.
pub const TOPIC_PREFIX: &str = "topic:";

/// Event name for data messages on `topic`.
pub fn topic_event(topic: &str) -> String {
    format!("{TOPIC_PREFIX}{topic}")
}

/// `true` for names the engine publishes itself.  A data message never
/// goes out under one of these.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, CONNECT | DISCONNECT | RECONNECT_FAILED | ROSTER)
        || name.starts_with(TOPIC_PREFIX)
}

/// Topic names the fleet server publishes on.
pub mod topics {
    pub const VEHICLES: &str = "vehicles";
    pub const DRIVERS: &str = "drivers";
    pub const ALERTS: &str = "alerts";
    pub const ANALYTICS: &str = "analytics";
    pub const ALL: &str = "all";
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Connection-state transitions surfaced to the renderer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConnectionEvent {
    Connect,
    Disconnect,
    /// Retry budget exhausted; the client stays down until told to connect.
    ReconnectFailed,
}

impl ConnectionEvent {
    pub fn name(self) -> &'static str {
        match self {
            ConnectionEvent::Connect         => CONNECT,
            ConnectionEvent::Disconnect      => DISCONNECT,
            ConnectionEvent::ReconnectFailed => RECONNECT_FAILED,
        }
    }
}

/// A validated inbound data message.
#[derive(Clone, Debug, PartialEq)]
pub struct DataMessage {
    /// The wire `type` tag (`"vehicle_update"`, `"alert"`, …).
    pub kind:  String,
    pub topic: Option<String>,
    pub data:  Map<String, Value>,
}

/// Everything the engine publishes.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    Connection(ConnectionEvent),
    Roster(RosterUpdate),
    Message(DataMessage),
}

impl EngineEvent {
    pub fn as_roster(&self) -> Option<&RosterUpdate> {
        match self {
            EngineEvent::Roster(r) => Some(r),
            _                      => None,
        }
    }

    pub fn as_message(&self) -> Option<&DataMessage> {
        match self {
            EngineEvent::Message(m) => Some(m),
            _                       => None,
        }
    }
}

/// The bus the engine publishes on.
pub type EngineBus = EventBus<EngineEvent>;

impl EventBus<EngineEvent> {
    /// Publish `event` under every name it answers to.
    ///
    /// | Event               | Names                               |
    /// |---------------------|-------------------------------------|
    /// | `Connection(c)`     | `c.name()`                          |
    /// | `Roster(_)`         | `roster`                            |
    /// | `Message(m)`        | `m.kind` unless reserved, and `topic:<m.topic>` |
    pub fn publish(&self, event: EngineEvent) -> Delivery {
        match &event {
            EngineEvent::Connection(c) => self.emit(c.name(), &event),
            EngineEvent::Roster(_)     => self.emit(ROSTER, &event),
            EngineEvent::Message(m)    => {
                let by_kind = if is_reserved(&m.kind) {
                    tracing::warn!(kind = %m.kind, "data message under a reserved name, not fanned out by kind");
                    Delivery::default()
                } else {
                    self.emit(&m.kind, &event)
                };
                match &m.topic {
                    None        => by_kind,
                    Some(topic) => by_kind.merge(self.emit(&topic_event(topic), &event)),
                }
            }
        }
    }
}
