use std::sync::Arc;

use domoprims_frame::Component;

use crate::device::{forward_updates, CallbackId, Device, DeviceCallback, ObserverSet};
use crate::error::Result;
use crate::session::Bus;
use crate::value::{RemoteValue, SwitchValue};

/// An on/off device, by default on the RELAY component.
///
/// Construction registers the switch's remote value with the session
/// registry, so inbound state feedback for its address flows back into
/// [`is_on`] and the registered observers.
///
/// [`is_on`]: Switch::is_on
#[derive(Debug)]
pub struct Switch {
    name: String,
    observers: Arc<ObserverSet>,
    switch: SwitchValue,
}

impl Switch {
    /// A relay-backed switch. `address` may be `None` for a device whose
    /// address is not wired up yet; sets then log and no-op.
    pub fn new(bus: &Bus, name: impl Into<String>, address: Option<u8>) -> Result<Self> {
        Self::with_component(bus, name, address, Component::Relay)
    }

    /// A switch on an explicit component category.
    pub fn with_component(
        bus: &Bus,
        name: impl Into<String>,
        address: Option<u8>,
        component: Component,
    ) -> Result<Self> {
        let name = name.into();
        let observers = Arc::new(ObserverSet::new());
        let value = RemoteValue::new(bus.queue(), component, address, name.clone());
        value.set_on_update(forward_updates(&observers));
        if let Some(address) = address {
            bus.registry().register(component, address, value.clone())?;
        }
        Ok(Self {
            name,
            observers,
            switch: SwitchValue::new(value, false),
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

    /// Switch on.
    pub async fn set_on(&self) -> Result<()> {
        self.switch.on().await
    }

    /// Switch off.
    pub async fn set_off(&self) -> Result<()> {
        self.switch.off().await
    }

    /// Last-known on/off state, once any state has been seen.
    pub fn is_on(&self) -> Option<bool> {
        self.switch.is_on()
    }

    /// The underlying switch value.
    pub fn value(&self) -> &SwitchValue {
        &self.switch
    }
}

impl Device for Switch {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self) -> Result<()> {
        self.switch.request_state()
    }
}
