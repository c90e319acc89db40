//! Frame acquisition
//!
//! One [`CaptureActor`] runs per admitted device. It opens the device's
//! stream through a [`StreamOpener`], pulls frames on its own thread, and
//! publishes the latest normalized frame plus a frame rate estimate into a
//! single-slot buffer that readers poll without blocking.

pub mod actor;
pub mod config;
pub mod frame;
pub mod rate;
pub mod source;

pub use actor::{CaptureActor, SnapshotReader};
pub use config::CaptureConfig;
pub use frame::{Frame, FrameSnapshot, BYTES_PER_PIXEL};
pub use rate::RateWindow;
pub use source::{FrameStream, StreamOpener};
