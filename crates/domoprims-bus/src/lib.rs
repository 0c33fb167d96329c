//! The telegram pipeline for the domoprims home-automation bus.
//!
//! A single ordered queue carries all outgoing commands, decoded inbound
//! events and periodic heartbeats. The processing loop serializes
//! outgoing traffic to the gateway and routes inbound events to the
//! remote value registered for their component and group address.
//! Three workers share the queue: the processing loop, the heartbeat
//! generator and the inbound pump fed by the transport read loop.

pub mod device;
pub mod dispatch;
pub mod error;
pub mod item;
pub mod queue;
pub mod registry;
pub mod session;
pub mod value;

pub use device::{CallbackId, Device, DeviceCallback, Dimmer, Light, ObserverSet, Switch};
pub use dispatch::{Dispatcher, TelegramOutlet};
pub use error::{BusError, Result};
pub use item::BusItem;
pub use queue::{QueueConfig, QueueState, TelegramQueue};
pub use registry::Registry;
pub use session::{Bus, BusConfig};
pub use value::{RemoteValue, ScalingValue, SwitchValue, UpdateCallback};
