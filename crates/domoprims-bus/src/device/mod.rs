//! Application-level device objects: registrants and consumers of the
//! telegram queue.

pub mod dimmer;
pub mod light;
pub mod switch;

pub use dimmer::Dimmer;
pub use light::Light;
pub use switch::Switch;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::value::{lock, UpdateCallback};

/// Callback invoked after a device's state changed.
pub type DeviceCallback =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Handle for removing a registered device callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackId(u64);

/// Registered device-updated observers.
///
/// Notification iterates over a snapshot, so a callback may unregister
/// itself (or any other observer) while a notification is in flight.
#[derive(Default)]
pub struct ObserverSet {
    observers: Mutex<Vec<(u64, Arc<DeviceCallback>)>>,
    next_id: AtomicU64,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; the returned id removes it again.
    pub fn register(&self, callback: DeviceCallback) -> CallbackId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, Arc::new(callback)));
        CallbackId(id)
    }

    /// Remove an observer. Returns whether it was present.
    pub fn unregister(&self, id: CallbackId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id.0);
        observers.len() != before
    }

    /// Invoke every observer registered at the time of the call.
    pub async fn notify(&self) {
        let snapshot: Vec<Arc<DeviceCallback>> = lock(&self.observers)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback().await;
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.len())
            .finish()
    }
}

/// Common surface of the concrete device types.
pub trait Device {
    /// The device's configured name.
    fn name(&self) -> &str;

    /// Request current state from the bus for every address the device
    /// monitors.
    fn sync(&self) -> Result<()>;
}

/// Bridge a remote value's after-update hook into a device observer set.
pub(crate) fn forward_updates(observers: &Arc<ObserverSet>) -> UpdateCallback {
    let observers = observers.clone();
    Box::new(move || {
        let observers = observers.clone();
        Box::pin(async move { observers.notify().await })
    })
}
