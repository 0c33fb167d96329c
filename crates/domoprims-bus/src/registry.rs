use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use domoprims_frame::Component;
use tracing::debug;

use crate::error::{BusError, Result};
use crate::value::RemoteValue;

/// Index of registered remote values: component category → group address
/// → value handle.
///
/// The device tree owns the values; the registry only indexes them for
/// dispatch. Registrations normally complete before steady-state traffic,
/// so dispatch reads vastly outnumber writes.
#[derive(Debug, Default)]
pub struct Registry {
    components: RwLock<HashMap<Component, HashMap<u8, Arc<RemoteValue>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a component category as monitored, creating its (possibly
    /// empty) address map. Feedback registration enables categories
    /// before any individual device registers.
    pub fn enable(&self, component: Component) {
        self.write().entry(component).or_default();
        debug!(component = %component, "component feedback enabled");
    }

    /// Whether a component category is monitored.
    pub fn is_enabled(&self, component: Component) -> bool {
        self.read().contains_key(&component)
    }

    /// Register a remote value for (component, address).
    ///
    /// Duplicate keys are rejected — a second registrant for the same
    /// address is a wiring mistake, not an overwrite.
    pub fn register(
        &self,
        component: Component,
        address: u8,
        value: Arc<RemoteValue>,
    ) -> Result<()> {
        let mut components = self.write();
        let addresses = components.entry(component).or_default();
        if addresses.contains_key(&address) {
            return Err(BusError::DuplicateRegistration {
                component: component.name(),
                address,
            });
        }
        addresses.insert(address, value);
        debug!(component = %component, address, "remote value registered");
        Ok(())
    }

    /// Remove a registration, returning the value handle if one existed.
    pub fn unregister(&self, component: Component, address: u8) -> Option<Arc<RemoteValue>> {
        self.write()
            .get_mut(&component)
            .and_then(|addresses| addresses.remove(&address))
    }

    /// Look up the registrant for (component, address).
    pub fn lookup(&self, component: Component, address: u8) -> Option<Arc<RemoteValue>> {
        self.read()
            .get(&component)
            .and_then(|addresses| addresses.get(&address))
            .cloned()
    }

    /// Number of registered values across all components.
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<Component, HashMap<u8, Arc<RemoteValue>>>> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<Component, HashMap<u8, Arc<RemoteValue>>>> {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TelegramQueue;

    fn value(component: Component, address: u8) -> Arc<RemoteValue> {
        RemoteValue::new(
            Arc::new(TelegramQueue::new()),
            component,
            Some(address),
            "test",
        )
    }

    #[test]
    fn register_and_lookup() {
        let registry = Registry::new();
        let relay = value(Component::Relay, 32);
        registry
            .register(Component::Relay, 32, relay.clone())
            .unwrap();

        assert!(registry.is_enabled(Component::Relay));
        assert!(registry.lookup(Component::Relay, 32).is_some());
        assert!(registry.lookup(Component::Relay, 33).is_none());
        assert!(registry.lookup(Component::Dimmer, 32).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Registry::new();
        registry
            .register(Component::Relay, 32, value(Component::Relay, 32))
            .unwrap();

        let err = registry
            .register(Component::Relay, 32, value(Component::Relay, 32))
            .unwrap_err();
        assert!(matches!(
            err,
            BusError::DuplicateRegistration {
                component: "RELAY",
                address: 32
            }
        ));
    }

    #[test]
    fn unregister_restores_the_key() {
        let registry = Registry::new();
        registry
            .register(Component::Flag, 7, value(Component::Flag, 7))
            .unwrap();

        assert!(registry.unregister(Component::Flag, 7).is_some());
        assert!(registry.lookup(Component::Flag, 7).is_none());
        assert!(registry.unregister(Component::Flag, 7).is_none());

        // The key is free again.
        registry
            .register(Component::Flag, 7, value(Component::Flag, 7))
            .unwrap();
    }

    #[test]
    fn enable_without_registrations() {
        let registry = Registry::new();
        registry.enable(Component::GenMood);
        assert!(registry.is_enabled(Component::GenMood));
        assert!(!registry.is_enabled(Component::LocMood));
        assert!(registry.is_empty());
    }
}
