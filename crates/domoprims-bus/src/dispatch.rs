use std::future::Future;
use std::sync::Arc;

use domoprims_frame::{EventFrame, Heartbeat};
use domoprims_transport::{GatewayClient, TransportError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::item::BusItem;
use crate::registry::Registry;

/// Where serialized telegrams go. Implemented by the gateway client; the
/// seam exists so the queue can be exercised without a live connection.
pub trait TelegramOutlet: Send + Sync + 'static {
    fn send_wire(
        &self,
        wire: &str,
    ) -> impl Future<Output = std::result::Result<(), TransportError>> + Send;
}

impl TelegramOutlet for GatewayClient {
    async fn send_wire(&self, wire: &str) -> std::result::Result<(), TransportError> {
        self.send(wire).await
    }
}

/// Routes each dequeued item: inbound events to their registered remote
/// value, everything else to the wire.
pub struct Dispatcher<O = GatewayClient> {
    registry: Arc<Registry>,
    outlet: O,
}

impl<O: TelegramOutlet> Dispatcher<O> {
    pub fn new(registry: Arc<Registry>, outlet: O) -> Self {
        Self { registry, outlet }
    }

    /// Process one queue item. Failures are fatal only to this item; the
    /// caller logs and moves on.
    pub async fn process(&self, item: BusItem) -> Result<()> {
        match item {
            BusItem::Inbound(frame) => {
                self.dispatch_event(frame).await;
                Ok(())
            }
            BusItem::Outgoing(telegram) => {
                let wire = telegram.encode()?;
                self.outlet.send_wire(&wire).await?;
                Ok(())
            }
            BusItem::Heartbeat => {
                self.outlet.send_wire(Heartbeat.encode()).await?;
                Ok(())
            }
            BusItem::Shutdown => Ok(()),
        }
    }

    /// Inbound dispatch. Never fails: unknown components are dropped,
    /// unregistered addresses are logged — noise and partial registration
    /// are normal operating conditions.
    async fn dispatch_event(&self, frame: EventFrame) {
        let Some(component) = frame.component else {
            debug!(code = frame.component_code, "event for unknown component dropped");
            return;
        };
        match self.registry.lookup(component, frame.address) {
            Some(value) => value.apply_state(frame.state).await,
            None => warn!(
                component = %component,
                address = frame.address,
                "no remote value registered for event"
            ),
        }
    }

    /// The registry this dispatcher routes against.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use domoprims_frame::{Component, FrameDecoder, Telegram};

    use super::*;
    use crate::queue::TelegramQueue;
    use crate::value::{RemoteValue, UpdateCallback};

    /// Outlet that records wire strings instead of touching a socket.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingOutlet {
        wires: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingOutlet {
        pub(crate) fn wires(&self) -> Vec<String> {
            self.wires.lock().unwrap().clone()
        }
    }

    impl TelegramOutlet for RecordingOutlet {
        async fn send_wire(&self, wire: &str) -> std::result::Result<(), TransportError> {
            self.wires.lock().unwrap().push(wire.to_string());
            Ok(())
        }
    }

    /// Outlet whose sends always fail.
    #[derive(Clone, Default)]
    pub(crate) struct FailingOutlet;

    impl TelegramOutlet for FailingOutlet {
        async fn send_wire(&self, _wire: &str) -> std::result::Result<(), TransportError> {
            Err(TransportError::Closed)
        }
    }

    pub(crate) fn event(component: u8, address: u8, state: u8) -> EventFrame {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&[2, 9, 16, 1, component, 0, address, 0, state, 1]);
        frames.remove(0)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> UpdateCallback {
        let counter = counter.clone();
        Box::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn inbound_routes_to_the_registered_value_only() {
        let queue = Arc::new(TelegramQueue::new());
        let registry = Arc::new(Registry::new());

        let relay = RemoteValue::new(queue.clone(), Component::Relay, Some(32), "r1");
        let relay_updates = Arc::new(AtomicUsize::new(0));
        relay.set_on_update(counting(&relay_updates));
        registry
            .register(Component::Relay, 32, relay.clone())
            .unwrap();

        let dimmer = RemoteValue::new(queue, Component::Dimmer, Some(1), "r2");
        registry
            .register(Component::Dimmer, 1, dimmer.clone())
            .unwrap();

        let dispatcher = Dispatcher::new(registry, RecordingOutlet::default());
        dispatcher
            .process(BusItem::Inbound(event(1, 32, 255)))
            .await
            .unwrap();

        assert_eq!(relay.value(), Some(255));
        assert_eq!(relay_updates.load(Ordering::SeqCst), 1);
        assert_eq!(dimmer.value(), None);
    }

    #[tokio::test]
    async fn unregistered_address_warns_without_mutation() {
        let queue = Arc::new(TelegramQueue::new());
        let registry = Arc::new(Registry::new());
        let relay = RemoteValue::new(queue, Component::Relay, Some(32), "r1");
        registry
            .register(Component::Relay, 32, relay.clone())
            .unwrap();

        let dispatcher = Dispatcher::new(registry, RecordingOutlet::default());
        dispatcher
            .process(BusItem::Inbound(event(1, 99, 255)))
            .await
            .unwrap();

        assert_eq!(relay.value(), None);
    }

    #[tokio::test]
    async fn unknown_component_code_is_dropped_silently() {
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()), RecordingOutlet::default());
        dispatcher
            .process(BusItem::Inbound(event(77, 1, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn outgoing_and_heartbeat_reach_the_outlet() {
        let outlet = RecordingOutlet::default();
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()), outlet.clone());

        dispatcher
            .process(BusItem::Outgoing(Telegram::get(Component::Relay, 32)))
            .await
            .unwrap();
        dispatcher.process(BusItem::Heartbeat).await.unwrap();

        assert_eq!(outlet.wires(), vec!["s,7,6,1,1,0,32,49,", "s,3,11,16,"]);
    }

    #[tokio::test]
    async fn transport_failure_is_fatal_to_the_item_only() {
        let dispatcher = Dispatcher::new(Arc::new(Registry::new()), FailingOutlet);
        let err = dispatcher.process(BusItem::Heartbeat).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::BusError::Transport(TransportError::Closed)
        ));
    }
}
