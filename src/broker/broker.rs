use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

type Handler<D> = Arc<dyn Fn(&D) + Send + Sync>;
type Hub<D> = HashMap<String, Vec<(HandlerId, Handler<D>)>>;

/// Token returned by [`EventBroker::on`], used to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A publish/subscribe hub keyed by event name.
///
/// Handlers for one event run in registration order. Cloning the broker
/// shares the same hub.
///
/// # Examples
///
/// ```
/// use cellstore::EventBroker;
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
///
/// let broker: EventBroker = EventBroker::new();
/// let got = Arc::new(Mutex::new(None));
///
/// let id = broker.on("login", {
///     let got = got.clone();
///     move |data| *got.lock().unwrap() = Some(data.clone())
/// });
///
/// broker.emit("login", &json!({ "user": "ann" }));
/// assert!(broker.off("login", id));
/// assert_eq!(broker.emit("login", &json!(null)), 0);
///
/// assert_eq!(*got.lock().unwrap(), Some(json!({ "user": "ann" })));
/// ```
pub struct EventBroker<D = Value> {
    hub: Arc<Mutex<Hub<D>>>,
    next_id: Arc<AtomicU64>,
}

impl<D> Clone for EventBroker<D> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<D> Default for EventBroker<D> {
    fn default() -> Self {
        Self {
            hub: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<D> fmt::Debug for EventBroker<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hub = self.hub();
        let mut events: Vec<(&str, usize)> = hub
            .iter()
            .map(|(event, handlers)| (event.as_str(), handlers.len()))
            .collect();
        events.sort_unstable();
        f.debug_struct("EventBroker").field("events", &events).finish()
    }
}

impl<D: 'static> EventBroker<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&D) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hub()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered for
    /// `event`.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut hub = self.hub();
        let Some(handlers) = hub.get_mut(event) else {
            return false;
        };
        let Some(index) = handlers.iter().position(|(handler_id, _)| *handler_id == id) else {
            return false;
        };
        handlers.remove(index);
        if handlers.is_empty() {
            hub.remove(event);
        }
        true
    }

    /// Call every handler of `event` with `data`. Returns how many ran.
    ///
    /// Handlers added or removed while emitting take effect on the next
    /// emit.
    pub fn emit(&self, event: &str, data: &D) -> usize {
        let handlers: Vec<Handler<D>> = self
            .hub()
            .get(event)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!(event, handlers = handlers.len(), "Emitting event");
        for handler in &handlers {
            handler(data);
        }
        handlers.len()
    }

    pub fn has_handlers(&self, event: &str) -> bool {
        self.hub().contains_key(event)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.hub().get(event).map_or(0, Vec::len)
    }

    /// Names of events with at least one handler.
    pub fn events(&self) -> Vec<String> {
        self.hub().keys().cloned().collect()
    }
}

impl<D> EventBroker<D> {
    fn hub(&self) -> MutexGuard<'_, Hub<D>> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collector() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&Value) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &Value| sink.lock().unwrap().push(v.clone()))
    }

    #[test]
    fn emit_reaches_handler() {
        let broker: EventBroker = EventBroker::new();
        let (seen, handler) = collector();

        broker.on("test", handler);
        assert_eq!(broker.emit("test", &json!({ "data": "test" })), 1);

        assert_eq!(*seen.lock().unwrap(), vec![json!({ "data": "test" })]);
    }

    #[test]
    fn off_stops_delivery() {
        let broker: EventBroker = EventBroker::new();
        let (seen, handler) = collector();

        let id = broker.on("test", handler);
        assert!(broker.off("test", id));
        broker.emit("test", &json!(1));

        assert!(seen.lock().unwrap().is_empty());
        assert!(!broker.has_handlers("test"));
    }

    #[test]
    fn multiple_handlers_run_in_order() {
        let broker: EventBroker<i32> = EventBroker::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            broker.on("tick", move |n| order.lock().unwrap().push(format!("{tag}:{n}")));
        }
        broker.emit("tick", &7);

        assert_eq!(*order.lock().unwrap(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn off_unknown_event_or_handler_is_noop() {
        let broker: EventBroker = EventBroker::new();
        let (seen, handler) = collector();
        let other = broker.on("other", |_| {});

        assert!(!broker.off("non-existent-event", other));

        broker.on("test-event", handler);
        assert!(!broker.off("test-event", other));

        broker.emit("test-event", &json!("test-data"));
        assert_eq!(*seen.lock().unwrap(), vec![json!("test-data")]);
    }

    #[test]
    fn unsubscribe_one_of_many() {
        let broker: EventBroker = EventBroker::new();
        let (first, first_handler) = collector();
        let (second, second_handler) = collector();

        let first_id = broker.on("test-event", first_handler);
        broker.on("test-event", second_handler);
        broker.emit("test-event", &json!("test-data"));

        broker.off("test-event", first_id);
        broker.emit("test-event", &json!("new-data"));

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 2);
        assert_eq!(broker.handler_count("test-event"), 1);
    }

    #[test]
    fn emit_without_handlers() {
        let broker: EventBroker = EventBroker::new();
        assert_eq!(broker.emit("nobody", &json!(null)), 0);
        assert!(broker.events().is_empty());
    }

    #[test]
    fn handler_can_register_during_emit() {
        let broker: EventBroker<()> = EventBroker::new();
        let inner = broker.clone();

        broker.on("grow", move |_| {
            inner.on("grow", |_| {});
        });

        assert_eq!(broker.emit("grow", &()), 1);
        assert_eq!(broker.handler_count("grow"), 2);
    }
}
