//! Event dispatcher
//!
//! In-process publish/subscribe hub that decouples the traffic sources from
//! their consumers. Channels are typed per [`EventKind`], so subscribing to
//! a malformed event name is unrepresentable. Handlers are untrusted: a
//! handler that panics is isolated and logged, and never prevents delivery
//! to subsequent handlers or reaches the publisher.

use crate::event::{Event, EventKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registered event handler
type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    channels: HashMap<EventKind, Vec<Registration>>,
}

/// Opaque deregistration handle returned by [`EventDispatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
}

impl SubscriptionHandle {
    /// The event kind this subscription is registered for
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Typed publish/subscribe hub
///
/// The dispatcher exclusively owns the registration set; the only mutation
/// paths are [`subscribe`](Self::subscribe),
/// [`unsubscribe`](Self::unsubscribe) and
/// [`unsubscribe_all`](Self::unsubscribe_all).
#[derive(Default)]
pub struct EventDispatcher {
    registry: RwLock<Registry>,
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event kind
    ///
    /// Handlers for the same kind are invoked in registration order.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.channels.entry(kind).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });

        debug!(kind = %kind, id, "Registered event handler");
        SubscriptionHandle { kind, id }
    }

    /// Remove a single subscription
    ///
    /// Returns `false` if the handle was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.registry.write();
        let Some(handlers) = registry.channels.get_mut(&handle.kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|r| r.id != handle.id);
        before != handlers.len()
    }

    /// Remove every handler for every event kind
    pub fn unsubscribe_all(&self) {
        let mut registry = self.registry.write();
        let removed: usize = registry.channels.values().map(Vec::len).sum();
        registry.channels.clear();
        debug!(removed, "Cleared all event subscriptions");
    }

    /// Number of handlers registered for a kind
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registry
            .read()
            .channels
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver an event to every handler registered for its kind
    ///
    /// Each handler runs isolated: a panic is caught, logged and counted,
    /// and delivery continues with the next handler. Returns the number of
    /// handlers that completed successfully.
    pub fn publish(&self, event: &Event) -> usize {
        let kind = event.kind();

        // Snapshot the registration list so untrusted handlers run without
        // the registry lock held and may themselves (un)subscribe.
        let handlers: Vec<(u64, Handler)> = {
            let registry = self.registry.read();
            registry
                .channels
                .get(&kind)
                .map(|regs| {
                    regs.iter()
                        .map(|r| (r.id, Arc::clone(&r.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = 0;
        let mut failed = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    failed += 1;
                    let cause = panic_message(payload.as_ref());
                    warn!(kind = %kind, subscriber = id, cause, "Event handler panicked");
                }
            }
        }

        if failed > 0 {
            warn!(kind = %kind, failed, delivered, "Handler failures during publish");
        }
        delivered
    }
}

/// Best-effort extraction of a panic payload message
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
