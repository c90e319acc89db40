//! Stream decoder collaborator
//!
//! Decoding lives outside this crate. A decoder binding implements
//! [`StreamOpener`] to open a URL and hands back a [`FrameStream`] that the
//! capture worker reads from.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OpenError, ReadError};

use super::frame::Frame;

/// Opens decodable streams
///
/// `open` may block for up to `open_timeout`. It runs on a capture thread or
/// on the blocking pool, never on an async worker.
pub trait StreamOpener: Send + Sync + 'static {
    fn open(
        &self,
        url: &str,
        open_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Arc<dyn FrameStream>, OpenError>;
}

/// An open, decodable stream
///
/// `read_frame` and `release` are called from different threads: the
/// capture worker blocks in `read_frame` while a force stop calls `release`.
pub trait FrameStream: Send + Sync {
    /// Pull the next decoded frame (blocking)
    ///
    /// Should give up after the read timeout passed to `open`, but is not
    /// required to. After `release` it must return promptly with an error.
    fn read_frame(&self) -> Result<Frame, ReadError>;

    /// Free the underlying connection and decoder; idempotent
    ///
    /// Must unblock a `read_frame` call in progress.
    fn release(&self);
}
