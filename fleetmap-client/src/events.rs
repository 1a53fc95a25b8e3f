use log::error;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

/// Topics the playback core publishes on. UI panels subscribe to these; the
/// core itself never subscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    VehicleSelected,
    SelectionCleared,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    VehicleSelected(String),
    SelectionCleared,
}

impl UiEvent {
    pub fn topic(&self) -> Topic {
        match self {
            UiEvent::VehicleSelected(_) => Topic::VehicleSelected,
            UiEvent::SelectionCleared => Topic::SelectionCleared,
        }
    }
}

type Handler = Arc<dyn Fn(&UiEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: HashMap<Topic, Vec<(u64, Handler)>>,
}

/// Session-scoped publish/subscribe registry. One instance per client
/// session; the original's module-global handler table is deliberately gone.
///
/// Delivery is synchronous and in subscription order. Handlers already
/// snapshotted for a publish keep running even if something unsubscribes
/// mid-delivery, and a panicking handler never blocks the handlers after it.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(self: &Arc<Self>, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&UiEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .handlers
            .entry(topic)
            .or_insert_with(Vec::new)
            .push((id, Arc::new(handler)));
        Subscription {
            bus: Arc::downgrade(self),
            topic,
            id,
        }
    }

    pub fn publish(&self, event: &UiEvent) {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock().unwrap();
            match inner.handlers.get(&event.topic()) {
                Some(entries) => entries.iter().map(|(_, h)| h.clone()).collect(),
                None => return,
            }
        };
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!("event handler panicked on {:?}, continuing", event.topic());
            }
        }
    }

    fn unsubscribe(&self, topic: Topic, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entries) = inner.handlers.get_mut(&topic) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }
}

/// Handle returned by `subscribe`. Dropping it (or calling `unsubscribe`)
/// removes the handler.
pub struct Subscription {
    bus: Weak<EventBus>,
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.topic, self.id);
        }
    }
}
