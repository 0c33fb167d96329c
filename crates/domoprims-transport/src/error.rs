use std::time::Duration;

/// Errors that can occur on the gateway transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the gateway connection.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// An operation exceeded its deadline.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// An I/O error occurred on the gateway stream.
    #[error("gateway I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is closed; sends fail fast instead of blocking.
    #[error("gateway connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
