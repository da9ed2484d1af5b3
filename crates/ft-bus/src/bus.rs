//! `EventBus<P>` — named-event fan-out with per-handler fault isolation.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{BusError, HandlerResult};

type Handler<P> = Arc<dyn Fn(&P) -> HandlerResult + Send + Sync>;

/// Opaque token returned by [`EventBus::on`]; pass it to [`EventBus::off`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct HandlerId(u64);

/// Outcome of one [`EventBus::emit`].
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Delivery {
    /// Handlers called.
    pub invoked: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed:  usize,
}

impl Delivery {
    pub(crate) fn merge(self, other: Delivery) -> Delivery {
        Delivery {
            invoked: self.invoked + other.invoked,
            failed:  self.failed + other.failed,
        }
    }
}

struct Registry<P> {
    next_id:  u64,
    handlers: HashMap<String, Vec<(HandlerId, Handler<P>)>>,
}

/// A typed publish/subscribe registry.
///
/// Handlers are grouped by event name and called in registration order.
/// `emit` snapshots the handler list before calling out, so handlers may
/// register or remove handlers (including themselves) while being invoked;
/// such changes take effect from the next `emit`.
///
/// A handler that returns `Err` or panics is logged and skipped; the
/// remaining handlers still receive the event.
///
/// Cloning is cheap and every clone shares the same registry.
pub struct EventBus<P> {
    inner: Arc<RwLock<Registry<P>>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventBus<P> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Registry {
                next_id:  0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Register `handler` for `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&P) -> HandlerResult + Send + Sync + 'static,
    {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = HandlerId(reg.next_id);
        reg.next_id += 1;
        reg.handlers
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Register `handler` and return a guard that removes it on drop.
    pub fn on_scoped<F>(&self, event: impl Into<String>, handler: F) -> Subscription<P>
    where
        F: Fn(&P) -> HandlerResult + Send + Sync + 'static,
    {
        let event = event.into();
        let id = self.on(event.clone(), handler);
        Subscription { bus: self.clone(), event, id, active: true }
    }

    /// Remove a handler.  Returns `false` if it was not registered on `event`.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = reg.handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(h, _)| *h != id);
        let removed = list.len() != before;
        if list.is_empty() {
            reg.handlers.remove(event);
        }
        removed
    }

    /// Call every handler registered on `event` with `payload`.
    pub fn emit(&self, event: &str, payload: &P) -> Delivery {
        let snapshot: Vec<(HandlerId, Handler<P>)> = {
            let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            match reg.handlers.get(event) {
                None       => return Delivery::default(),
                Some(list) => list.clone(),
            }
        };

        let mut delivery = Delivery::default();
        for (id, handler) in snapshot {
            delivery.invoked += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(payload)));
            let err = match outcome {
                Ok(Ok(()))   => continue,
                Ok(Err(e))   => BusError::Handler(e),
                Err(panic)   => BusError::HandlerPanicked(panic_message(&*panic)),
            };
            delivery.failed += 1;
            tracing::error!(event = %event, handler = ?id, error = %err, "event handler failed");
        }
        delivery
    }

    /// Emit `payload` under several names, summing the deliveries.
    pub fn emit_all<'a>(&self, events: impl IntoIterator<Item = &'a str>, payload: &P) -> Delivery {
        events
            .into_iter()
            .fold(Delivery::default(), |acc, ev| acc.merge(self.emit(ev, payload)))
    }

    /// Number of handlers currently registered on `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        let reg = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        reg.handlers.get(event).map_or(0, Vec::len)
    }

    /// Remove every handler on every event.
    pub fn clear(&self) {
        let mut reg = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        reg.handlers.clear();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── Subscription ──────────────────────────────────────────────────────────────

/// RAII handle from [`EventBus::on_scoped`].  Dropping it unregisters the
/// handler.
pub struct Subscription<P> {
    bus:    EventBus<P>,
    event:  String,
    id:     HandlerId,
    active: bool,
}

impl<P> Subscription<P> {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Keep the handler registered for the life of the bus.
    pub fn detach(mut self) -> HandlerId {
        self.active = false;
        self.id
    }
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        if self.active {
            self.bus.off(&self.event, self.id);
        }
    }
}
