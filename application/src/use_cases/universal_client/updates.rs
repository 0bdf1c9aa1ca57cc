//! Update channel: callbacks keyed by subscription id.
//!
//! Callbacks run synchronously in subscription order. They are invoked
//! outside the registry lock, so a callback may subscribe or unsubscribe.

use omnitool_domain::{SubscriptionId, UpdateEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

pub type UpdateCallback = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

#[derive(Default)]
pub struct UpdateBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, UpdateCallback)>>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: UpdateCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push((id, callback));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut listeners) = self.listeners.write() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every subscriber. A panicking callback is logged
    /// and does not stop delivery to the others.
    pub fn publish(&self, event: &UpdateEvent) {
        let listeners: Vec<(SubscriptionId, UpdateCallback)> = match self.listeners.read() {
            Ok(l) => l.clone(),
            Err(_) => return,
        };
        debug!(event = event.event_type(), subscribers = listeners.len(), "Publishing update");

        for (id, callback) in listeners {
            let delivered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event)));
            if delivered.is_err() {
                warn!(subscription = %id, event = event.event_type(), "Update subscriber panicked");
            }
        }
    }
}
