use std::sync::Arc;

use domoprims_frame::Component;

use crate::device::{forward_updates, CallbackId, Device, DeviceCallback, ObserverSet};
use crate::error::Result;
use crate::session::Bus;
use crate::value::{RemoteValue, ScalingValue};

/// A dimmable light without a separate relay: the brightness channel
/// also turns it on and off.
#[derive(Debug)]
pub struct Dimmer {
    name: String,
    observers: Arc<ObserverSet>,
    brightness: ScalingValue,
}

impl Dimmer {
    pub fn new(bus: &Bus, name: impl Into<String>, address: Option<u8>) -> Result<Self> {
        let name = name.into();
        let observers = Arc::new(ObserverSet::new());
        let value = RemoteValue::new(bus.queue(), Component::Dimmer, address, name.clone());
        value.set_on_update(forward_updates(&observers));
        if let Some(address) = address {
            bus.registry()
                .register(Component::Dimmer, address, value.clone())?;
        }
        Ok(Self {
            name,
            observers,
            brightness: ScalingValue::new(value),
        })
    }

    /// Observe state changes; the id removes the observer again.
    pub fn on_updated(&self, callback: DeviceCallback) -> CallbackId {
        self.observers.register(callback)
    }

    /// Remove a previously registered observer.
    pub fn remove_updated(&self, id: CallbackId) -> bool {
        self.observers.unregister(id)
    }

    /// Drive fully on.
    pub async fn set_on(&self) -> Result<()> {
        self.brightness.on().await
    }

    /// Drive fully off.
    pub async fn set_off(&self) -> Result<()> {
        self.brightness.off().await
    }

    /// Set brightness as a percentage.
    pub async fn set_brightness(&self, percent: u8) -> Result<()> {
        self.brightness.set_percent(percent).await
    }

    /// Last-known brightness percentage.
    pub fn current_brightness(&self) -> Option<u8> {
        self.brightness.percent()
    }

    /// Whether the last-known state is anything but fully off.
    pub fn is_on(&self) -> Option<bool> {
        self.brightness.inner().value().map(|raw| raw != 0)
    }
}

impl Device for Dimmer {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self) -> Result<()> {
        self.brightness.request_state()
    }
}
