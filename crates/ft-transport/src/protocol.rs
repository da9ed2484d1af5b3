//! Wire messages, one JSON object per frame.
//!
//! Outbound frames are built from the closed [`Outbound`] enum.  Inbound
//! frames are validated into [`Inbound`] at the boundary; anything that does
//! not fit is rejected here and never reaches the bus.

use ft_bus::{is_reserved, DataMessage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TransportError, TransportResult};

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Client → server.
///
/// ```json
/// {"type":"subscribe","topic":"vehicles"}
/// {"type":"unsubscribe","topic":"vehicles"}
/// {"type":"ping"}
/// {"type":"publish","topic":"alerts","data":{…}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Subscribe {
        topic: String,
    },
    Unsubscribe {
        topic: String,
    },
    Ping,
    Publish {
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        data:  Map<String, Value>,
    },
}

impl Outbound {
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Outbound::Subscribe { topic: topic.into() }
    }

    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Outbound::Unsubscribe { topic: topic.into() }
    }

    pub fn to_json(&self) -> TransportResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

const PONG: &str = "pong";
const PING: &str = "ping";

/// Server → client.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Reply to our keepalive.
    Pong { timestamp: Option<f64> },
    /// Server heartbeat.
    Ping,
    /// Anything else: `{"type": s, "topic"?: s, "data": {…}}`.
    Data(DataMessage),
}

impl Inbound {
    /// `true` for frames that only prove the peer is alive.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Inbound::Pong { .. } | Inbound::Ping)
    }

    pub fn parse(text: &str) -> TransportResult<Inbound> {
        let raw: RawInbound = serde_json::from_str(text)?;
        Inbound::try_from(raw)
    }
}

#[derive(Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind:      String,
    #[serde(default)]
    topic:     Option<String>,
    #[serde(default)]
    data:      Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

impl TryFrom<RawInbound> for Inbound {
    type Error = TransportError;

    fn try_from(raw: RawInbound) -> TransportResult<Inbound> {
        if is_reserved(&raw.kind) {
            return Err(TransportError::Malformed(format!("{:?}: reserved message type", raw.kind)));
        }
        match raw.kind.as_str() {
            PONG => Ok(Inbound::Pong { timestamp: raw.timestamp.as_ref().and_then(Value::as_f64) }),
            PING => Ok(Inbound::Ping),
            ""   => Err(TransportError::Malformed("empty message type".into())),
            _ => match raw.data {
                Some(Value::Object(data)) => Ok(Inbound::Data(DataMessage {
                    kind: raw.kind,
                    topic: raw.topic,
                    data,
                })),
                Some(other) => Err(TransportError::Malformed(format!(
                    "{:?}: data must be an object, got {}",
                    raw.kind,
                    json_kind(&other)
                ))),
                None => Err(TransportError::Malformed(format!("{:?}: missing data", raw.kind))),
            },
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}
