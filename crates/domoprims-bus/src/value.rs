use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domoprims_frame::{Component, Setting, Telegram};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::Result;
use crate::item::BusItem;
use crate::queue::TelegramQueue;

/// Deferred after-update notifier attached to a remote value.
pub type UpdateCallback =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Ceiling on a single after-update notification; a slow callback is
/// logged and abandoned rather than stalling dispatch.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// One device function's last-known bus state.
///
/// Owned by its device; the registry only indexes it. Mutated exclusively
/// through the dispatch path ([`apply_state`]) or an explicit application
/// [`set`].
///
/// [`apply_state`]: RemoteValue::apply_state
/// [`set`]: RemoteValue::set
pub struct RemoteValue {
    component: Component,
    address: Option<u8>,
    device_name: String,
    payload: Mutex<Option<u8>>,
    on_update: Mutex<Option<UpdateCallback>>,
    queue: Arc<TelegramQueue>,
}

impl RemoteValue {
    /// Create a remote value that enqueues its telegrams on `queue`.
    pub fn new(
        queue: Arc<TelegramQueue>,
        component: Component,
        address: Option<u8>,
        device_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            component,
            address,
            device_name: device_name.into(),
            payload: Mutex::new(None),
            on_update: Mutex::new(None),
            queue,
        })
    }

    /// Install the after-update notifier, replacing any previous one.
    pub fn set_on_update(&self, callback: UpdateCallback) {
        *lock(&self.on_update) = Some(callback);
    }

    /// Whether the value has a group address to talk to.
    pub fn initialized(&self) -> bool {
        self.address.is_some()
    }

    /// The component category this value belongs to.
    pub fn component(&self) -> Component {
        self.component
    }

    /// The group address, when initialized.
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// Name of the owning device, for logs.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Last-known payload byte, if any state has been seen or set.
    pub fn value(&self) -> Option<u8> {
        *lock(&self.payload)
    }

    /// Drive the device to `value`.
    ///
    /// The SET telegram is enqueued on every call — the device always
    /// asserts its desired state on the bus — while the after-update
    /// notifier fires only when the cached payload actually changed.
    pub async fn set(&self, value: u8) -> Result<()> {
        let Some(address) = self.address else {
            info!(
                device = %self.device_name,
                value,
                "set on device without group address; ignoring"
            );
            return Ok(());
        };

        let changed = self.store(value);
        self.queue
            .put(BusItem::Outgoing(Telegram::set(self.component, address, value)))?;
        if changed {
            self.notify().await;
        }
        Ok(())
    }

    /// Ask the bus for the device's current state.
    pub fn request_state(&self) -> Result<()> {
        let Some(address) = self.address else {
            info!(device = %self.device_name, "state request on device without group address; ignoring");
            return Ok(());
        };
        self.queue
            .put(BusItem::Outgoing(Telegram::get(self.component, address)))
    }

    /// Apply a state reported by the bus. Dispatch path: the cached
    /// payload is updated and the notifier fired only when the state
    /// differs from what is cached (or nothing is cached yet).
    pub async fn apply_state(&self, state: u8) {
        if self.store(state) {
            self.notify().await;
        }
    }

    /// Cache `value`; true when it differed from the previous payload.
    fn store(&self, value: u8) -> bool {
        let mut payload = lock(&self.payload);
        if *payload == Some(value) {
            false
        } else {
            *payload = Some(value);
            true
        }
    }

    async fn notify(&self) {
        let pending = lock(&self.on_update).as_ref().map(|callback| callback());
        let Some(pending) = pending else { return };
        if timeout(NOTIFY_TIMEOUT, pending).await.is_err() {
            warn!(
                device = %self.device_name,
                "after-update callback exceeded {NOTIFY_TIMEOUT:?}; abandoned"
            );
        }
    }
}

impl std::fmt::Debug for RemoteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteValue")
            .field("component", &self.component)
            .field("address", &self.address)
            .field("device_name", &self.device_name)
            .field("payload", &self.value())
            .finish_non_exhaustive()
    }
}

/// On/off view over a remote value.
#[derive(Debug, Clone)]
pub struct SwitchValue {
    value: Arc<RemoteValue>,
    invert: bool,
}

impl SwitchValue {
    pub fn new(value: Arc<RemoteValue>, invert: bool) -> Self {
        Self { value, invert }
    }

    /// Switch on.
    pub async fn on(&self) -> Result<()> {
        self.set_bool(true).await
    }

    /// Switch off.
    pub async fn off(&self) -> Result<()> {
        self.set_bool(false).await
    }

    /// Drive to an explicit boolean state.
    pub async fn set_bool(&self, on: bool) -> Result<()> {
        let setting = if on ^ self.invert {
            Setting::On
        } else {
            Setting::Off
        };
        self.value.set(setting.code()).await
    }

    /// Last-known on/off state, once any state has been seen.
    pub fn is_on(&self) -> Option<bool> {
        self.value
            .value()
            .map(|raw| (raw == Setting::On.code()) ^ self.invert)
    }

    /// Ask the bus for the current state.
    pub fn request_state(&self) -> Result<()> {
        self.value.request_state()
    }

    /// The underlying remote value.
    pub fn inner(&self) -> &Arc<RemoteValue> {
        &self.value
    }
}

/// Percentage view over a remote value (dimmer brightness).
#[derive(Debug, Clone)]
pub struct ScalingValue {
    value: Arc<RemoteValue>,
    range_from: u8,
    range_to: u8,
}

impl ScalingValue {
    pub fn new(value: Arc<RemoteValue>) -> Self {
        Self::with_range(value, 0, 100)
    }

    /// A scaling value clamped into `[range_from, range_to]`.
    pub fn with_range(value: Arc<RemoteValue>, range_from: u8, range_to: u8) -> Self {
        Self {
            value,
            range_from,
            range_to,
        }
    }

    /// Drive brightness to a percentage, clamped into the configured range.
    pub async fn set_percent(&self, percent: u8) -> Result<()> {
        let clamped = percent.clamp(self.range_from, self.range_to);
        self.value.set(clamped).await
    }

    /// Drive fully on.
    pub async fn on(&self) -> Result<()> {
        self.value.set(Setting::On.code()).await
    }

    /// Drive fully off.
    pub async fn off(&self) -> Result<()> {
        self.value.set(Setting::Off.code()).await
    }

    /// Last-known brightness as a percentage. A full-on setting byte
    /// reads as the top of the range.
    pub fn percent(&self) -> Option<u8> {
        self.value.value().map(|raw| {
            if raw == Setting::On.code() {
                self.range_to
            } else {
                raw.min(self.range_to)
            }
        })
    }

    /// Whether the value has a group address to talk to.
    pub fn initialized(&self) -> bool {
        self.value.initialized()
    }

    /// Ask the bus for the current state.
    pub fn request_state(&self) -> Result<()> {
        self.value.request_state()
    }

    /// The underlying remote value.
    pub fn inner(&self) -> &Arc<RemoteValue> {
        &self.value
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
