//! Registry of admitted devices
//!
//! The registry is the only state shared between the discovery loop, the
//! reachability loop and display consumers.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<DeviceRegistry>
//!                   ┌─────────────────────────────┐
//!                   │ devices: HashMap<address,   │
//!                   │   DeviceHandle {            │
//!                   │     stream_url, last_seen,  │
//!                   │     actor: CaptureActor,    │
//!                   │   }                         │
//!                   │ >                           │
//!                   └──────────────┬──────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!  [Discovery loop]      [Reachability loop]           [Consumer]
//!    try_admit()        mark_seen() / remove_if_stale()  devices()
//!                                  │                        │
//!                                  ▼                        ▼
//!                     DeviceHandle::shutdown()    SnapshotReader::snapshot()
//! ```
//!
//! # Lock discipline
//!
//! The map lives behind one `parking_lot::Mutex`. Nothing that can block on
//! the network or a decoder runs while it is held: removal hands the handle
//! back and the caller tears the worker down afterwards.

pub mod entry;
pub mod store;

pub use entry::{DeviceHandle, DeviceInfo};
pub use store::DeviceRegistry;
