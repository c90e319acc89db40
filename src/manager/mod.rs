//! Device lifecycle management
//!
//! [`DeviceManager`] runs two independent loops over a shared
//! [`DeviceRegistry`](crate::registry::DeviceRegistry):
//!
//! - **Discovery**: every `discovery_interval`, ask the discovery
//!   collaborator for addresses, keep those in scope and not yet
//!   registered, validate their feeds, and admit the ones that pass with a
//!   fresh capture worker.
//! - **Reachability**: every `reachability_tick_interval`, ping all
//!   registered devices in parallel. A device that answers is marked seen;
//!   one that has not answered for longer than `ping_loss_timeout` is
//!   removed and its worker force-stopped.
//!
//! Reachability is the only thing that evicts a device. Failed frame reads
//! are absorbed by the capture worker.

pub mod config;
pub mod lifecycle;

pub use config::ManagerConfig;
pub use lifecycle::DeviceManager;
