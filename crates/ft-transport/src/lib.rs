//! `ft-transport` — the engine's connection to the fleet server.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`client`]   | `TransportClient`, `ConnectionState` — the reconnect actor |
//! | [`protocol`] | `Outbound`, `Inbound` — the JSON wire messages             |
//! | [`backoff`]  | `Backoff` — `min(base * 2^n, max)` with an attempt budget  |
//! | [`channel`]  | `Connector`, `Channel` — the pluggable framed-text seam    |
//! | [`tcp`]      | `TcpConnector` — newline-delimited JSON over TCP           |
//! | [`error`]    | `TransportError`, `TransportResult<T>`                     |
//!
//! Inbound data messages are published on the [`ft_bus::EngineBus`] under
//! their `type` and under `topic:<topic>`; connection transitions as
//! `connect`, `disconnect` and `reconnect_failed`.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ft_bus::{topics, EngineBus};
//! use ft_core::TransportConfig;
//! use ft_transport::{TcpConnector, TransportClient};
//!
//! let bus = EngineBus::new();
//! let client = TransportClient::start(
//!     TransportConfig::default(),
//!     TcpConnector::new("127.0.0.1:9000"),
//!     bus.clone(),
//! )?;
//! client.subscribe(topics::VEHICLES);
//! client.connect();
//! // …
//! client.shutdown().await;
//! ```

pub mod backoff;
pub mod channel;
pub mod client;
pub mod error;
pub mod protocol;
pub mod tcp;

#[cfg(test)]
mod tests;

pub use backoff::Backoff;
pub use channel::{Channel, Connector};
pub use client::{ConnectionState, TransportClient};
pub use error::{TransportError, TransportResult};
pub use protocol::{Inbound, Outbound};
pub use tcp::{TcpChannel, TcpConnector};
