//! Device handle and consumer views
//!
//! This module defines the per-device state stored in the registry.

use std::time::{Duration, Instant};

use crate::capture::{CaptureActor, FrameSnapshot, SnapshotReader};

/// One admitted device
///
/// Owns the device's capture worker. Created when a device passes feed
/// validation, torn down once when it is evicted or the manager stops.
#[derive(Debug)]
pub struct DeviceHandle {
    /// Network address the device was discovered at
    pub address: String,

    /// Stream URL derived from the address
    pub stream_url: String,

    /// When the device was admitted
    pub admitted_at: Instant,

    /// Last successful reachability check (admission counts as one)
    pub(super) last_seen: Instant,

    actor: CaptureActor,
}

impl DeviceHandle {
    /// Create a handle around a running capture worker
    pub fn new(
        address: impl Into<String>,
        stream_url: impl Into<String>,
        actor: CaptureActor,
    ) -> Self {
        let now = Instant::now();
        Self {
            address: address.into(),
            stream_url: stream_url.into(),
            admitted_at: now,
            last_seen: now,
            actor,
        }
    }

    /// Last successful reachability check
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// The device's capture worker
    pub fn actor(&self) -> &CaptureActor {
        &self.actor
    }

    /// Latest frame and frame rate
    pub fn snapshot(&self) -> FrameSnapshot {
        self.actor.snapshot()
    }

    /// Consumer-facing view of this device
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            address: self.address.clone(),
            stream_url: self.stream_url.clone(),
            last_seen: self.last_seen,
            reader: self.actor.reader(),
        }
    }

    /// Force-stop the capture worker and wait up to `timeout` for it
    ///
    /// Returns `false` if the worker had to be abandoned.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        self.actor.force_stop();
        let stopped = self.actor.join(timeout).await;

        if !stopped {
            tracing::warn!(
                address = %self.address,
                timeout_ms = timeout.as_millis() as u64,
                "Capture worker did not stop in time, abandoning it"
            );
        }

        stopped
    }
}

/// Read-only view of a registered device for display consumers
///
/// Holding one does not keep the device registered; its reader just stops
/// updating after eviction.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub address: String,
    pub stream_url: String,
    pub last_seen: Instant,
    pub reader: SnapshotReader,
}

impl DeviceInfo {
    /// Latest frame and frame rate
    pub fn snapshot(&self) -> FrameSnapshot {
        self.reader.snapshot()
    }
}
