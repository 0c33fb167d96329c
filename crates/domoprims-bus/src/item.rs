use domoprims_frame::{EventFrame, Telegram};

/// Everything that can pass through the telegram queue.
///
/// The variant is decided at construction time; FIFO ordering across the
/// whole union is the sole ordering guarantee the queue provides.
#[derive(Debug, Clone)]
pub enum BusItem {
    /// An application-originated command headed for the wire.
    Outgoing(Telegram),
    /// A decoded inbound event headed for dispatch.
    Inbound(EventFrame),
    /// A periodic keepalive headed for the wire.
    Heartbeat,
    /// Sentinel that drains and stops the processing loop.
    Shutdown,
}

impl BusItem {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BusItem::Outgoing(_) => "outgoing",
            BusItem::Inbound(_) => "inbound",
            BusItem::Heartbeat => "heartbeat",
            BusItem::Shutdown => "shutdown",
        }
    }
}
