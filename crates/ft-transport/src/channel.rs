//! The seam between the client and whatever carries its frames.

use async_trait::async_trait;

use crate::TransportResult;

/// A connected, framed, bidirectional text channel.
///
/// `recv` must be cancel-safe: the client races it against timers and
/// commands and drops the losing future.
#[async_trait]
pub trait Channel: Send {
    async fn send(&mut self, frame: &str) -> TransportResult<()>;

    /// Next inbound frame.  `Ok(None)` when the peer closed cleanly.
    async fn recv(&mut self) -> TransportResult<Option<String>>;

    /// Best-effort close.  Errors are swallowed.
    async fn close(&mut self);
}

/// Opens [`Channel`]s.  Called once per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel + 'static;

    async fn connect(&self) -> TransportResult<Self::Channel>;
}
