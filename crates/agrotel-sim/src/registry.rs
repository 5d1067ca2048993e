//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Ordered subscriber registry with isolated fan-out."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use agrotel_logging::{agt_error, LogContext};
use parking_lot::Mutex;

/// Callback stored in a registry.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Outcome of one fan-out pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Entries<T> {
    next_handle: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

/// Subscribers keyed by a monotonically increasing handle, delivered in
/// registration order. Handles are never reused, even across `clear`.
pub struct SubscriberRegistry<T> {
    name: &'static str,
    entries: Mutex<Entries<T>>,
}

impl<T: 'static> SubscriberRegistry<T> {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            entries: Mutex::new(Entries {
                next_handle: 0,
                callbacks: BTreeMap::new(),
            }),
        })
    }

    /// Register a callback and return the handle that identifies it.
    pub fn insert(self: &Arc<Self>, callback: Callback<T>) -> Subscription {
        let mut entries = self.entries.lock();
        entries.next_handle += 1;
        let handle = entries.next_handle;
        entries.callbacks.insert(handle, callback);
        let registry: Weak<dyn Detach> = Arc::downgrade(self) as Weak<dyn Detach>;
        Subscription { handle, registry }
    }

    pub fn remove(&self, handle: u64) -> bool {
        self.entries.lock().callbacks.remove(&handle).is_some()
    }

    /// Drop every registration, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.callbacks.len();
        entries.callbacks.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, handle: u64) -> Option<Callback<T>> {
        self.entries.lock().callbacks.get(&handle).cloned()
    }

    /// Invoke every registered callback with `event`.
    ///
    /// Callbacks run without the registry lock held, so they may subscribe or
    /// unsubscribe. A callback removed during the pass is skipped; one added
    /// during the pass first sees the next event.
    pub fn deliver(&self, event: &T) -> DeliveryReport {
        let handles: Vec<u64> = self.entries.lock().callbacks.keys().copied().collect();
        let mut report = DeliveryReport::default();
        for handle in handles {
            if let Some(callback) = self.lookup(handle) {
                if self.invoke(handle, &callback, event) {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Invoke a single registration, if it is still present.
    pub fn deliver_to(&self, handle: u64, event: &T) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if let Some(callback) = self.lookup(handle) {
            if self.invoke(handle, &callback, event) {
                report.delivered = 1;
            } else {
                report.failed = 1;
            }
        }
        report
    }

    fn invoke(&self, handle: u64, callback: &Callback<T>, event: &T) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(()) => true,
            Err(payload) => {
                agt_error!(
                    context = LogContext::new(),
                    "{} subscriber #{} panicked: {}",
                    self.name,
                    handle,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

trait Detach: Send + Sync {
    fn detach(&self, handle: u64) -> bool;
}

impl<T: 'static> Detach for SubscriberRegistry<T> {
    fn detach(&self, handle: u64) -> bool {
        self.remove(handle)
    }
}

/// Unsubscribe handle returned by the simulator's subscribe calls.
///
/// Dropping the handle keeps the registration alive; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    handle: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Remove exactly this registration. Returns `false` when it was already
    /// gone (second call, or wiped by a disconnect).
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.detach(self.handle))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish()
    }
}
