//! Subscriber registry for parsed events.
//!
//! Delivery is synchronous, on the caller's thread, in subscription order.
//! Each `emit` iterates over a snapshot taken under the lock, and the lock is
//! released before any callback runs, so callbacks may subscribe or
//! unsubscribe (themselves or others) without affecting the current delivery.

use draftdeck_types::ParsedEvent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked for every emitted event.
pub type Listener = dyn Fn(&ParsedEvent) + Send + Sync;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Arc<Listener>)>,
}

/// Shared, cloneable publish point. Clones deliver to the same listener set.
#[derive(Clone, Default)]
pub struct EventEmitter {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns the handle used to remove it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ParsedEvent) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(callback)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver an event to every listener registered at the time of the call.
    pub fn emit(&self, event: &ParsedEvent) {
        let snapshot: Vec<Arc<Listener>> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.lock().listeners.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`EventEmitter::subscribe`].
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str) -> impl Fn(&ParsedEvent) + Send + Sync + use<> {
        let log = log.clone();
        move |_event| log.lock().unwrap().push(name.to_string())
    }

    fn event() -> ParsedEvent {
        ParsedEvent::session_id("abc")
    }

    #[test]
    fn test_delivers_in_subscription_order() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();
        emitter.subscribe(recorder(&log, "a"));
        emitter.subscribe(recorder(&log, "b"));
        emitter.subscribe(recorder(&log, "c"));

        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();
        let a = emitter.subscribe(recorder(&log, "a"));
        emitter.subscribe(recorder(&log, "b"));

        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(emitter.listener_count(), 1);

        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_unsubscribe_during_delivery_keeps_snapshot() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();

        let a = emitter.subscribe(recorder(&log, "a"));
        emitter.subscribe(recorder(&log, "c"));
        let log_b = log.clone();
        emitter.subscribe(move |_event| {
            log_b.lock().unwrap().push("b".to_string());
            a.unsubscribe();
        });

        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["a", "c", "b"]);

        log.lock().unwrap().clear();
        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["c", "b"]);
    }

    #[test]
    fn test_listener_unsubscribing_itself() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();

        let slot_in = slot.clone();
        let log_in = log.clone();
        let sub = emitter.subscribe(move |_event| {
            log_in.lock().unwrap().push("once".to_string());
            if let Some(sub) = slot_in.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        emitter.emit(&event());
        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["once"]);
    }

    #[test]
    fn test_subscribe_during_delivery_takes_effect_next_emit() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();

        let inner_emitter = emitter.clone();
        let inner_log = log.clone();
        let added = Arc::new(Mutex::new(false));
        emitter.subscribe(move |_event| {
            let mut added = added.lock().unwrap();
            if !*added {
                inner_emitter.subscribe(recorder(&inner_log, "late"));
                *added = true;
            }
        });

        emitter.emit(&event());
        assert!(log.lock().unwrap().is_empty());

        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
    }

    #[test]
    fn test_clones_share_listeners() {
        let emitter = EventEmitter::new();
        let clone = emitter.clone();
        let log: Log = Arc::default();
        clone.subscribe(recorder(&log, "x"));

        emitter.emit(&event());
        assert_eq!(*log.lock().unwrap(), vec!["x"]);
    }

    #[test]
    fn test_clear_removes_all() {
        let emitter = EventEmitter::new();
        let log: Log = Arc::default();
        let sub = emitter.subscribe(recorder(&log, "x"));
        emitter.clear();
        emitter.emit(&event());
        assert!(log.lock().unwrap().is_empty());

        // Still safe after clear.
        sub.unsubscribe();
    }

    #[test]
    fn test_unsubscribe_after_emitter_dropped() {
        let emitter = EventEmitter::new();
        let sub = emitter.subscribe(|_event| {});
        drop(emitter);
        sub.unsubscribe();
    }
}
