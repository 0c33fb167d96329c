/// Errors that can occur in the telegram queue and dispatch layer.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The queue has been stopped; enqueueing fails instead of hanging.
    #[error("telegram queue is closed")]
    QueueClosed,

    /// The queue's processing loop is already running.
    #[error("telegram queue is already running")]
    QueueRunning,

    /// The operation requires a started queue.
    #[error("telegram queue has not been started")]
    QueueNotStarted,

    /// The session was started twice.
    #[error("bus session already started")]
    AlreadyStarted,

    /// The session has not been started.
    #[error("bus session not started")]
    NotStarted,

    /// A remote value is already registered for this key.
    #[error("a remote value is already registered for {component} address {address}")]
    DuplicateRegistration {
        component: &'static str,
        address: u8,
    },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] domoprims_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] domoprims_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, BusError>;
