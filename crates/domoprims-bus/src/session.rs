use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domoprims_frame::{Component, EventFrame, Telegram};
use domoprims_transport::{GatewayClient, GatewayConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{BusError, Result};
use crate::item::BusItem;
use crate::queue::{QueueConfig, TelegramQueue};
use crate::registry::Registry;

/// Component categories enabled by [`Bus::register_feedback`].
const FEEDBACK_COMPONENTS: [Component; 5] = [
    Component::Relay,
    Component::Dimmer,
    Component::LocMood,
    Component::GenMood,
    Component::Flag,
];

/// Configuration for a bus session.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub gateway: GatewayConfig,
    pub queue: QueueConfig,
    /// Pause between the LOG telegrams of [`Bus::register_feedback`],
    /// giving the gateway room to acknowledge each category.
    pub feedback_spacing: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            queue: QueueConfig::default(),
            feedback_spacing: Duration::from_secs(1),
        }
    }
}

/// The owning session: one gateway connection, one telegram queue, one
/// registry of device state.
///
/// Devices are constructed against a `Bus` and register their remote
/// values here; [`start`] wires the pipeline together and [`stop`] drains
/// and tears it down.
///
/// [`start`]: Bus::start
/// [`stop`]: Bus::stop
#[derive(Debug)]
pub struct Bus {
    config: BusConfig,
    queue: Arc<TelegramQueue>,
    registry: Arc<Registry>,
    inner: Mutex<SessionInner>,
}

#[derive(Debug, Default)]
struct SessionInner {
    started: bool,
    client: Option<GatewayClient>,
    pump: Option<JoinHandle<()>>,
    pump_cancel: Option<CancellationToken>,
}

impl Bus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        let queue = Arc::new(TelegramQueue::with_config(config.queue.clone()));
        Self {
            config,
            queue,
            registry: Arc::new(Registry::new()),
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// The shared telegram queue.
    pub fn queue(&self) -> Arc<TelegramQueue> {
        self.queue.clone()
    }

    /// The shared dispatch registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Connect to the gateway and start the pipeline: the transport read
    /// loop, the inbound pump and the queue's processing loop plus
    /// heartbeat generator. Connect failure is reported, never retried.
    pub async fn start(&self, host: &str, port: u16) -> Result<()> {
        if self.lock().started {
            return Err(BusError::AlreadyStarted);
        }

        let (client, frames) =
            GatewayClient::connect_with_config(host, port, self.config.gateway.clone()).await?;

        let pump_cancel = CancellationToken::new();
        let pump = tokio::spawn(inbound_pump(
            frames,
            self.queue.clone(),
            pump_cancel.clone(),
        ));

        let dispatcher = Dispatcher::new(self.registry.clone(), client.clone());
        if let Err(err) = self.queue.start(dispatcher) {
            pump_cancel.cancel();
            client.stop().await;
            return Err(err);
        }

        let mut inner = self.lock();
        inner.started = true;
        inner.client = Some(client);
        inner.pump = Some(pump);
        inner.pump_cancel = Some(pump_cancel);
        info!(host, port, "bus session started");
        Ok(())
    }

    /// Drain the queue, then stop the pipeline. Everything enqueued
    /// before this call is processed first; afterwards sends fail with
    /// [`BusError::QueueClosed`].
    pub async fn stop(&self) -> Result<()> {
        let (client, pump, pump_cancel) = {
            let mut inner = self.lock();
            if !inner.started {
                return Err(BusError::NotStarted);
            }
            inner.started = false;
            (
                inner.client.take(),
                inner.pump.take(),
                inner.pump_cancel.take(),
            )
        };

        let drained = self.queue.stop().await;

        // The transport comes down even when the queue was already closed.
        if let Some(cancel) = pump_cancel {
            cancel.cancel();
        }
        if let Some(client) = client {
            client.stop().await;
        }
        if let Some(pump) = pump {
            let _ = pump.await;
        }
        drained?;
        info!("bus session stopped");
        Ok(())
    }

    /// Register for asynchronous state feedback: one LOG telegram per
    /// monitored component category, spaced out so the gateway can settle
    /// between registrations.
    pub async fn register_feedback(&self) -> Result<()> {
        for component in FEEDBACK_COMPONENTS {
            self.registry.enable(component);
            self.queue
                .put(BusItem::Outgoing(Telegram::log(component)))?;
            tokio::time::sleep(self.config.feedback_spacing).await;
        }
        Ok(())
    }

    /// Enqueue an outgoing telegram.
    pub fn send(&self, telegram: Telegram) -> Result<()> {
        self.queue.put(BusItem::Outgoing(telegram))
    }

    /// Whether [`start`] has completed and [`stop`] has not.
    ///
    /// [`start`]: Bus::start
    /// [`stop`]: Bus::stop
    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    /// Whether the gateway connection is still usable.
    pub fn is_connected(&self) -> bool {
        self.lock()
            .client
            .as_ref()
            .is_some_and(GatewayClient::is_connected)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Third worker of the pipeline: forwards decoded event frames from the
/// transport into the shared queue until cancelled or the connection ends.
async fn inbound_pump(
    mut frames: mpsc::UnboundedReceiver<EventFrame>,
    queue: Arc<TelegramQueue>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.recv() => frame,
        };
        match frame {
            Some(frame) => {
                if queue.put(BusItem::Inbound(frame)).is_err() {
                    debug!("queue closed; inbound pump ending");
                    break;
                }
            }
            None => {
                warn!("gateway connection lost");
                break;
            }
        }
    }
}
