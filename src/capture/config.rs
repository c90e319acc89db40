//! Capture worker configuration

use std::time::Duration;

/// Per-device capture settings
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Width every published frame is normalized to
    pub frame_width: u32,

    /// Height every published frame is normalized to
    pub frame_height: u32,

    /// Trailing window for the frame rate estimate
    pub frame_rate_window: Duration,

    /// Passed to the decoder when opening the stream
    pub open_timeout: Duration,

    /// Passed to the decoder as its per-read timeout
    pub read_timeout: Duration,

    /// Pause after a failed read before trying again
    pub read_retry_delay: Duration,

    /// Pause after a failed open before trying again
    pub reopen_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_width: 1440,
            frame_height: 720,
            frame_rate_window: Duration::from_secs(5),
            open_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            read_retry_delay: Duration::from_millis(50),
            reopen_delay: Duration::from_secs(1),
        }
    }
}

impl CaptureConfig {
    /// Set the normalized frame size (each side at least 1)
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width.max(1);
        self.frame_height = height.max(1);
        self
    }

    /// Set the frame rate window
    pub fn frame_rate_window(mut self, window: Duration) -> Self {
        self.frame_rate_window = window;
        self
    }

    /// Set the decoder open and read timeouts
    pub fn timeouts(mut self, open: Duration, read: Duration) -> Self {
        self.open_timeout = open;
        self.read_timeout = read;
        self
    }

    /// Set the delay after a failed read
    pub fn read_retry_delay(mut self, delay: Duration) -> Self {
        self.read_retry_delay = delay;
        self
    }

    /// Set the delay after a failed open
    pub fn reopen_delay(mut self, delay: Duration) -> Self {
        self.reopen_delay = delay;
        self
    }
}
