//! Client protocol stack for a home-automation bus reachable over a
//! persistent gateway connection.
//!
//! domoprims speaks the gateway's comma-delimited ASCII telegram format,
//! serializes all outgoing traffic through a single ordered queue, and
//! routes decoded inbound events to registered device state.
//!
//! # Crate Structure
//!
//! - [`frame`] — Telegram codec, inbound event decoder, protocol codes
//! - [`transport`] — Persistent TCP gateway client with its read loop
//! - [`bus`] — Telegram queue, dispatch registry, remote values, devices

/// Re-export frame types.
pub mod frame {
    pub use domoprims_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use domoprims_transport::*;
}

/// Re-export bus types.
pub mod bus {
    pub use domoprims_bus::*;
}
