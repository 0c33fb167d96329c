use std::sync::Arc;

use domoprims_frame::Component;
use tracing::warn;

use crate::device::{forward_updates, CallbackId, Device, DeviceCallback, ObserverSet};
use crate::error::Result;
use crate::session::Bus;
use crate::value::{RemoteValue, ScalingValue, SwitchValue};

/// A relay-switched light, optionally with a dimmer-backed brightness
/// channel behind a separate group address.
#[derive(Debug)]
pub struct Light {
    name: String,
    observers: Arc<ObserverSet>,
    switch: SwitchValue,
    brightness: Option<ScalingValue>,
}

impl Light {
    pub fn new(
        bus: &Bus,
        name: impl Into<String>,
        switch_address: Option<u8>,
        brightness_address: Option<u8>,
    ) -> Result<Self> {
        let name = name.into();
        let observers = Arc::new(ObserverSet::new());

        let switch_value =
            RemoteValue::new(bus.queue(), Component::Relay, switch_address, name.clone());
        switch_value.set_on_update(forward_updates(&observers));
        if let Some(address) = switch_address {
            bus.registry()
                .register(Component::Relay, address, switch_value.clone())?;
        }

        let brightness = match brightness_address {
            Some(address) => {
                let value =
                    RemoteValue::new(bus.queue(), Component::Dimmer, Some(address), name.clone());
                value.set_on_update(forward_updates(&observers));
                bus.registry()
                    .register(Component::Dimmer, address, value.clone())?;
                Some(ScalingValue::new(value))
            }
            None => None,
        };

        Ok(Self {
            name,
            observers,
            switch: SwitchValue::new(switch_value, false),
            brightness,
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

    /// Switch the light on.
    pub async fn set_on(&self) -> Result<()> {
        self.switch.on().await
    }

    /// Switch the light off.
    pub async fn set_off(&self) -> Result<()> {
        self.switch.off().await
    }

    /// Last-known on/off state.
    pub fn is_on(&self) -> Option<bool> {
        self.switch.is_on()
    }

    /// Whether a brightness channel is wired up.
    pub fn supports_brightness(&self) -> bool {
        self.brightness
            .as_ref()
            .is_some_and(ScalingValue::initialized)
    }

    /// Set brightness as a percentage. Without a brightness channel this
    /// logs and no-ops.
    pub async fn set_brightness(&self, percent: u8) -> Result<()> {
        match &self.brightness {
            Some(brightness) => brightness.set_percent(percent).await,
            None => {
                warn!(device = %self.name, "dimming not supported");
                Ok(())
            }
        }
    }

    /// Last-known brightness percentage, when a brightness channel exists.
    pub fn current_brightness(&self) -> Option<u8> {
        self.brightness.as_ref().and_then(ScalingValue::percent)
    }
}

impl Device for Light {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self) -> Result<()> {
        self.switch.request_state()?;
        if let Some(brightness) = &self.brightness {
            brightness.request_state()?;
        }
        Ok(())
    }
}
