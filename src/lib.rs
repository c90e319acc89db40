//! Live view of the video devices on a local network segment
//!
//! `camfleet` discovers candidate devices, checks that each one really
//! serves a decodable stream, keeps pulling the latest frame and a frame
//! rate estimate from every admitted device, and evicts devices that stop
//! answering pings.
//!
//! The discovery protocol and the stream decoder are collaborators supplied
//! by the caller through [`Discovery`] and [`StreamOpener`]. Display code
//! reads the [`DeviceRegistry`] and polls snapshots; it never blocks the
//! capture workers.
//!
//! ```text
//!   Discovery ──► AddressFilter ──► FeedValidator ──► DeviceRegistry::try_admit
//!                                   (port, open)             │
//!                                                            ▼
//!   NetworkProber::ping ◄── reachability loop        CaptureActor (thread)
//!          │                                                 │
//!          └── silent > ping_loss_timeout ──► evict          ▼
//!                                              FrameSnapshot { frame, frame_rate }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use camfleet::{
//!     DeviceManager, FrameStream, ManagerConfig, OpenError, StaticDiscovery, StreamOpener,
//!     SystemProber,
//! };
//!
//! struct MyDecoder;
//!
//! impl StreamOpener for MyDecoder {
//!     fn open(
//!         &self,
//!         url: &str,
//!         _open_timeout: Duration,
//!         _read_timeout: Duration,
//!     ) -> Result<Arc<dyn FrameStream>, OpenError> {
//!         Err(OpenError::Unavailable(format!("no decoder for {url}")))
//!     }
//! }
//!
//! # async fn example() -> camfleet::Result<()> {
//! let manager = DeviceManager::new(
//!     ManagerConfig::default().address_filter("10.0.0.0/8".parse()?),
//!     Arc::new(StaticDiscovery::new(["10.0.0.21", "10.0.0.22"])),
//!     Arc::new(SystemProber::new()),
//!     Arc::new(MyDecoder),
//! );
//! manager.start()?;
//!
//! for device in manager.registry().devices() {
//!     let snapshot = device.snapshot();
//!     println!("{}: {:.1} fps", device.address, snapshot.frame_rate);
//! }
//!
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod probe;
pub mod registry;
pub mod stats;

pub use capture::{
    CaptureActor, CaptureConfig, Frame, FrameSnapshot, FrameStream, SnapshotReader, StreamOpener,
};
pub use discovery::{AddressFilter, Discovery, StaticDiscovery};
pub use error::{
    DiscoveryError, Error, FrameError, OpenError, ReadError, Result, ValidationFailure,
};
pub use manager::{DeviceManager, ManagerConfig};
pub use probe::{Candidate, FeedValidator, NetworkProber, SystemProber};
pub use registry::{DeviceHandle, DeviceInfo, DeviceRegistry};
pub use stats::{FleetStats, FleetStatsSnapshot};
