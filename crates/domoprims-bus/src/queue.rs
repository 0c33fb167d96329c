use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dispatch::{Dispatcher, TelegramOutlet};
use crate::error::{BusError, Result};
use crate::item::BusItem;

/// Configuration for the telegram queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Interval between keepalive telegrams.
    pub heartbeat_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

/// Lifecycle of the queue's processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// The single FIFO through which all outgoing telegrams, decoded inbound
/// events and periodic heartbeats pass.
///
/// The channel is unbounded, matching the non-blocking enqueue contract;
/// sustained producer overrun is a documented back-pressure risk, not a
/// drop. Lifecycle: Idle → Running ([`start`]) → Draining ([`stop`]
/// appends the shutdown sentinel) → Stopped (sentinel dequeued, stopped
/// signal fired).
///
/// [`start`]: TelegramQueue::start
/// [`stop`]: TelegramQueue::stop
#[derive(Debug)]
pub struct TelegramQueue {
    tx: mpsc::UnboundedSender<BusItem>,
    config: QueueConfig,
    inner: Mutex<QueueInner>,
}

#[derive(Debug)]
struct QueueInner {
    state: QueueState,
    rx: Option<mpsc::UnboundedReceiver<BusItem>>,
    stopped_rx: Option<oneshot::Receiver<()>>,
    heartbeat: Option<CancellationToken>,
}

impl TelegramQueue {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            config,
            inner: Mutex::new(QueueInner {
                state: QueueState::Idle,
                rx: Some(rx),
                stopped_rx: None,
                heartbeat: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QueueState {
        self.lock().state
    }

    /// Append an item to the tail of the queue. Non-blocking; fails with
    /// [`BusError::QueueClosed`] once the queue is draining or stopped.
    pub fn put(&self, item: BusItem) -> Result<()> {
        if matches!(
            self.lock().state,
            QueueState::Draining | QueueState::Stopped
        ) {
            return Err(BusError::QueueClosed);
        }
        self.tx.send(item).map_err(|_| BusError::QueueClosed)
    }

    /// Spawn the processing loop and the heartbeat generator.
    pub fn start<O: TelegramOutlet>(&self, dispatcher: Dispatcher<O>) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            QueueState::Idle => {}
            QueueState::Running | QueueState::Draining => return Err(BusError::QueueRunning),
            QueueState::Stopped => return Err(BusError::QueueClosed),
        }
        let rx = inner.rx.take().ok_or(BusError::QueueRunning)?;

        let (stopped_tx, stopped_rx) = oneshot::channel();
        tokio::spawn(process_loop(rx, dispatcher, stopped_tx));

        let heartbeat = CancellationToken::new();
        tokio::spawn(heartbeat_loop(
            self.tx.clone(),
            self.config.heartbeat_interval,
            heartbeat.clone(),
        ));

        inner.state = QueueState::Running;
        inner.stopped_rx = Some(stopped_rx);
        inner.heartbeat = Some(heartbeat);
        debug!("telegram queue started");
        Ok(())
    }

    /// Drain and stop: cancel the heartbeat generator, append the
    /// shutdown sentinel — FIFO discipline guarantees every item enqueued
    /// before this call is processed first — and wait for the loop's
    /// one-shot stopped signal.
    pub async fn stop(&self) -> Result<()> {
        let (stopped_rx, heartbeat) = {
            let mut inner = self.lock();
            match inner.state {
                QueueState::Running => {}
                QueueState::Idle => return Err(BusError::QueueNotStarted),
                QueueState::Draining | QueueState::Stopped => return Err(BusError::QueueClosed),
            }
            inner.state = QueueState::Draining;
            (inner.stopped_rx.take(), inner.heartbeat.take())
        };

        debug!("stopping telegram queue");
        if let Some(heartbeat) = heartbeat {
            heartbeat.cancel();
        }
        self.tx
            .send(BusItem::Shutdown)
            .map_err(|_| BusError::QueueClosed)?;
        if let Some(stopped) = stopped_rx {
            let _ = stopped.await;
        }

        self.lock().state = QueueState::Stopped;
        info!("telegram queue stopped");
        Ok(())
    }

    /// Synchronously drain everything currently queued, without stopping.
    ///
    /// The backlog is snapshotted first, so items enqueued while the
    /// batch is being processed are left alone. Only valid while the
    /// processing loop is not running.
    pub async fn process_all<O: TelegramOutlet>(
        &self,
        dispatcher: &Dispatcher<O>,
    ) -> Result<usize> {
        let mut rx = {
            let mut inner = self.lock();
            match inner.state {
                QueueState::Idle => {}
                QueueState::Running | QueueState::Draining => return Err(BusError::QueueRunning),
                QueueState::Stopped => return Err(BusError::QueueClosed),
            }
            inner.rx.take().ok_or(BusError::QueueRunning)?
        };

        let mut backlog = Vec::new();
        while let Ok(item) = rx.try_recv() {
            backlog.push(item);
        }
        self.lock().rx = Some(rx);

        let mut processed = 0;
        for item in backlog {
            if matches!(item, BusItem::Shutdown) {
                continue;
            }
            let kind = item.kind();
            if let Err(err) = dispatcher.process(item).await {
                error!(item = kind, error = %err, "failed processing queued item");
            }
            processed += 1;
        }
        Ok(processed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TelegramQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs once per dequeued item until the shutdown sentinel. A failure
/// while processing a single item is logged and never stops the loop.
async fn process_loop<O: TelegramOutlet>(
    mut rx: mpsc::UnboundedReceiver<BusItem>,
    dispatcher: Dispatcher<O>,
    stopped_tx: oneshot::Sender<()>,
) {
    while let Some(item) = rx.recv().await {
        if matches!(item, BusItem::Shutdown) {
            break;
        }
        let kind = item.kind();
        if let Err(err) = dispatcher.process(item).await {
            error!(item = kind, error = %err, "failed processing queue item");
        }
    }
    debug!("telegram queue drained");
    let _ = stopped_tx.send(());
}

/// Enqueues a heartbeat every interval until cancelled. Enqueue is
/// non-blocking, so the generator has no back-pressure awareness.
async fn heartbeat_loop(
    tx: mpsc::UnboundedSender<BusItem>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if tx.send(BusItem::Heartbeat).is_err() {
                    break;
                }
            }
        }
    }
    debug!("heartbeat generator stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use domoprims_frame::{Command, Component, Telegram};

    use super::*;
    use crate::dispatch::tests::{FailingOutlet, RecordingOutlet};
    use crate::registry::Registry;

    fn dispatcher(outlet: RecordingOutlet) -> Dispatcher<RecordingOutlet> {
        Dispatcher::new(Arc::new(Registry::new()), outlet)
    }

    #[tokio::test]
    async fn fifo_order_is_preserved_through_stop() {
        let queue = TelegramQueue::with_config(QueueConfig {
            heartbeat_interval: Duration::from_secs(3600),
        });
        let expected: Vec<String> = (0..10)
            .map(|address| {
                let telegram = Telegram::get(Component::Relay, address);
                queue.put(BusItem::Outgoing(telegram.clone())).unwrap();
                telegram.encode().unwrap()
            })
            .collect();

        let outlet = RecordingOutlet::default();
        queue.start(dispatcher(outlet.clone())).unwrap();
        queue.stop().await.unwrap();

        // Everything enqueued before stop() drains, in order, before the
        // sentinel takes effect. The heartbeat interval is long enough
        // that no keepalive interleaves except the immediate first tick.
        let wires: Vec<String> = outlet
            .wires()
            .into_iter()
            .filter(|w| w != "s,3,11,16,")
            .collect();
        assert_eq!(wires, expected);
        assert_eq!(queue.state(), QueueState::Stopped);
    }

    #[tokio::test]
    async fn put_after_stop_fails_fast() {
        let queue = TelegramQueue::new();
        queue.start(dispatcher(RecordingOutlet::default())).unwrap();
        queue.stop().await.unwrap();

        let err = queue.put(BusItem::Heartbeat).unwrap_err();
        assert!(matches!(err, BusError::QueueClosed));
    }

    #[tokio::test]
    async fn stop_twice_fails_and_stop_before_start_fails() {
        let queue = TelegramQueue::new();
        assert!(matches!(
            queue.stop().await.unwrap_err(),
            BusError::QueueNotStarted
        ));

        queue.start(dispatcher(RecordingOutlet::default())).unwrap();
        queue.stop().await.unwrap();
        assert!(matches!(
            queue.stop().await.unwrap_err(),
            BusError::QueueClosed
        ));
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let queue = TelegramQueue::new();
        queue.start(dispatcher(RecordingOutlet::default())).unwrap();
        let err = queue
            .start(dispatcher(RecordingOutlet::default()))
            .unwrap_err();
        assert!(matches!(err, BusError::QueueRunning));
        queue.stop().await.unwrap();
    }

    #[tokio::test]
    async fn process_all_drains_the_snapshot_only() {
        let queue = TelegramQueue::new();
        for address in [1, 2, 3] {
            queue
                .put(BusItem::Outgoing(Telegram::get(Component::Relay, address)))
                .unwrap();
        }

        let outlet = RecordingOutlet::default();
        let dispatcher = dispatcher(outlet.clone());
        assert_eq!(queue.process_all(&dispatcher).await.unwrap(), 3);
        assert_eq!(outlet.wires().len(), 3);
        assert_eq!(queue.state(), QueueState::Idle);

        // Nothing left behind; the queue can still start afterwards.
        assert_eq!(queue.process_all(&dispatcher).await.unwrap(), 0);
        queue.start(dispatcher).unwrap();
        queue.stop().await.unwrap();
    }

    #[tokio::test]
    async fn process_all_on_a_running_queue_fails() {
        let queue = TelegramQueue::new();
        let outlet = RecordingOutlet::default();
        queue.start(dispatcher(outlet.clone())).unwrap();

        let probe = dispatcher(outlet);
        assert!(matches!(
            queue.process_all(&probe).await.unwrap_err(),
            BusError::QueueRunning
        ));
        queue.stop().await.unwrap();
    }

    #[tokio::test]
    async fn heartbeats_are_generated_and_cancelled_on_stop() {
        let queue = TelegramQueue::with_config(QueueConfig {
            heartbeat_interval: Duration::from_millis(20),
        });
        let outlet = RecordingOutlet::default();
        queue.start(dispatcher(outlet.clone())).unwrap();

        tokio::time::sleep(Duration::from_millis(110)).await;
        queue.stop().await.unwrap();

        let heartbeats = outlet
            .wires()
            .into_iter()
            .filter(|w| w == "s,3,11,16,")
            .count();
        assert!(heartbeats >= 3, "expected several heartbeats, got {heartbeats}");

        // The generator is cancelled with the queue; nothing accrues after.
        let settled = outlet.wires().len();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(outlet.wires().len(), settled);
    }

    #[tokio::test]
    async fn a_poison_item_never_stops_the_loop() {
        let queue = TelegramQueue::with_config(QueueConfig {
            heartbeat_interval: Duration::from_secs(3600),
        });
        // GROUPSET has no outgoing payload table; encoding fails.
        queue
            .put(BusItem::Outgoing(Telegram::new(
                Command::GroupSet,
                Some(Component::Relay),
                Some(1),
                None,
            )))
            .unwrap();
        queue
            .put(BusItem::Outgoing(Telegram::get(Component::Relay, 2)))
            .unwrap();

        let outlet = RecordingOutlet::default();
        queue.start(dispatcher(outlet.clone())).unwrap();
        queue.stop().await.unwrap();

        let wires: Vec<String> = outlet
            .wires()
            .into_iter()
            .filter(|w| w != "s,3,11,16,")
            .collect();
        assert_eq!(wires, vec![Telegram::get(Component::Relay, 2).encode().unwrap()]);
    }

    #[tokio::test]
    async fn transport_failures_do_not_stop_the_loop() {
        let queue = TelegramQueue::with_config(QueueConfig {
            heartbeat_interval: Duration::from_secs(3600),
        });
        for address in [1, 2] {
            queue
                .put(BusItem::Outgoing(Telegram::get(Component::Relay, address)))
                .unwrap();
        }

        let failing = Dispatcher::new(Arc::new(Registry::new()), FailingOutlet);
        queue.start(failing).unwrap();
        // stop() completing proves the loop survived both failed sends.
        queue.stop().await.unwrap();
        assert_eq!(queue.state(), QueueState::Stopped);
    }
}
