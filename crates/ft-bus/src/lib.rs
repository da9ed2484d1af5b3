//! `ft-bus` — typed publish/subscribe fan-out.
//!
//! The simulator and the transport client both publish onto one
//! [`EngineBus`]; renderers subscribe by event name.
//!
//! ```rust,ignore
//! let bus = EngineBus::new();
//! let _sub = bus.on_scoped(ft_bus::ROSTER, |ev| {
//!     if let Some(update) = ev.as_roster() {
//!         repaint(&update.entities);
//!     }
//!     Ok(())
//! });
//! ```
//!
//! A failing handler (returned `Err` or panic) is logged and never stops
//! delivery to the remaining handlers.

pub mod bus;
pub mod error;
pub mod event;


pub use bus::{Delivery, EventBus, HandlerId, Subscription};
pub use error::{BusError, HandlerError, HandlerResult};
pub use event::{
    is_reserved, topic_event, topics, ConnectionEvent, DataMessage, EngineBus, EngineEvent, CONNECT,
    DISCONNECT, RECONNECT_FAILED, ROSTER, TOPIC_PREFIX,
};
