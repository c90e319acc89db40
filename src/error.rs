//! Error types
//!
//! None of these are fatal to a running manager. Collaborator failures are
//! logged and retried by the loop that hit them; only setup errors reach
//! the caller.

use std::time::Duration;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("stream open failed: {0}")]
    Open(#[from] OpenError),

    #[error("frame read failed: {0}")]
    Read(#[from] ReadError),

    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("invalid address filter: {0}")]
    InvalidFilter(String),

    #[error("device manager is already running")]
    AlreadyRunning,

    #[error("no Tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one discovery cycle
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Failure to open a stream
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpenError {
    #[error("open timed out after {0:?}")]
    Timeout(Duration),

    #[error("stream unavailable: {0}")]
    Unavailable(String),
}

/// Failure to pull a frame from an open stream
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    /// Nothing arrived within the read timeout
    #[error("no frame available")]
    NoFrame,

    #[error("decode error: {0}")]
    Decode(String),

    /// The stream was released while (or before) reading
    #[error("stream released")]
    Released,
}

/// A raw buffer that cannot be a packed RGB frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame dimensions must be non-zero ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("expected {expected} bytes of pixel data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Why a candidate device was not admitted this cycle
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationFailure {
    #[error("port {0} is not open")]
    PortClosed(u16),

    #[error("feed did not open: {0}")]
    Feed(#[from] OpenError),
}
