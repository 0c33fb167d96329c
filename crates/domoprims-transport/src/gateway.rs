use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domoprims_frame::{EventFrame, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};

/// Configuration for the gateway connection.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for a single telegram write.
    pub write_timeout: Duration,
    /// Read buffer size for the inbound loop.
    pub read_chunk_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            read_chunk_size: 1024,
        }
    }
}

/// Client side of one persistent gateway connection.
///
/// Cheap to clone; all clones share the same connection. The read loop
/// runs as its own task, decoding inbound bytes into [`EventFrame`]s and
/// forwarding them on the channel returned by [`connect`]. The client
/// never reconnects on its own: connection loss is surfaced to the log,
/// the frame channel terminates, and subsequent sends fail fast with
/// [`TransportError::Closed`].
///
/// [`connect`]: GatewayClient::connect
#[derive(Debug, Clone)]
pub struct GatewayClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    peer: String,
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    cancel: CancellationToken,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Connect to a gateway with default configuration.
    pub async fn connect(
        host: &str,
        port: u16,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EventFrame>)> {
        Self::connect_with_config(host, port, GatewayConfig::default()).await
    }

    /// Connect to a gateway with explicit configuration.
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        config: GatewayConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EventFrame>)> {
        let peer = format!("{host}:{port}");
        let stream = match timeout(config.connect_timeout, TcpStream::connect(&peer)).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    op: "connect",
                    after: config.connect_timeout,
                })
            }
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                })
            }
            Ok(Ok(stream)) => stream,
        };
        // Telegrams are tiny and latency-sensitive.
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        let client = Self {
            inner: Arc::new(Inner {
                peer: peer.clone(),
                writer: Mutex::new(Some(write_half)),
                connected: AtomicBool::new(true),
                cancel: CancellationToken::new(),
                config,
            }),
        };

        tokio::spawn(read_loop(read_half, frame_tx, client.inner.clone()));

        info!(peer = %peer, "connected to gateway");
        Ok((client, frame_rx))
    }

    /// Write one serialized telegram to the wire as a single discrete
    /// write. Fails fast with [`TransportError::Closed`] once the
    /// connection is gone.
    pub async fn send(&self, wire: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }

        let mut guard = self.inner.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        debug!(peer = %self.inner.peer, telegram = wire, "sending");
        let write = async {
            writer.write_all(wire.as_bytes()).await?;
            writer.flush().await
        };
        match timeout(self.inner.config.write_timeout, write).await {
            Err(_) => {
                self.mark_closed(&mut guard);
                Err(TransportError::Timeout {
                    op: "send",
                    after: self.inner.config.write_timeout,
                })
            }
            Ok(Err(source)) => {
                error!(peer = %self.inner.peer, error = %source, "gateway write failed");
                self.mark_closed(&mut guard);
                Err(TransportError::Io(source))
            }
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Stop the connection: cancel the read loop and shut the write half
    /// down. Idempotent.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        self.inner.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.inner.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        debug!(peer = %self.inner.peer, "gateway client stopped");
    }

    /// Whether the connection is still usable.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// The `host:port` this client is connected to.
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    fn mark_closed(&self, writer: &mut Option<OwnedWriteHalf>) {
        self.inner.connected.store(false, Ordering::SeqCst);
        *writer = None;
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    frame_tx: mpsc::UnboundedSender<EventFrame>,
    inner: Arc<Inner>,
) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; inner.config.read_chunk_size];

    'read: loop {
        let read = tokio::select! {
            _ = inner.cancel.cancelled() => break,
            read = read_half.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => {
                warn!(peer = %inner.peer, "gateway closed the connection");
                break;
            }
            Ok(n) => {
                for frame in decoder.feed(&chunk[..n]) {
                    debug!(peer = %inner.peer, %frame, "received");
                    if frame_tx.send(frame).is_err() {
                        // Receiver went away; nothing left to deliver to.
                        break 'read;
                    }
                }
            }
            Err(err) => {
                error!(peer = %inner.peer, error = %err, "gateway read failed");
                break;
            }
        }
    }

    inner.connected.store(false, Ordering::SeqCst);
    // Dropping frame_tx terminates the frame channel so the consumer
    // observes connection loss.
}
