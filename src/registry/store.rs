//! Device registry implementation
//!
//! The single map of admitted devices, shared by the discovery loop, the
//! reachability loop and display consumers.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::capture::FrameSnapshot;

use super::entry::{DeviceHandle, DeviceInfo};

/// Thread-safe map from address to device handle
///
/// Holds at most one handle per address. Every operation takes the lock
/// briefly and never does I/O under it: teardown of a removed device
/// happens after its handle has been handed back to the caller.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Mutex<HashMap<String, DeviceHandle>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a device if its address is not registered yet
    ///
    /// On a duplicate the registry is left untouched and the handle is
    /// returned so the caller can tear down its worker.
    pub fn try_admit(&self, handle: DeviceHandle) -> Result<(), DeviceHandle> {
        let mut devices = self.devices.lock();

        if devices.contains_key(&handle.address) {
            return Err(handle);
        }

        tracing::info!(
            address = %handle.address,
            url = %handle.stream_url,
            devices = devices.len() + 1,
            "Device admitted"
        );
        devices.insert(handle.address.clone(), handle);
        Ok(())
    }

    /// Remove and return a device, or `None` if it is already gone
    pub fn remove(&self, address: &str) -> Option<DeviceHandle> {
        self.devices.lock().remove(address)
    }

    /// Remove a device only if it has not been seen for longer than `timeout`
    ///
    /// The staleness check and the removal happen under one lock, so a
    /// device refreshed or evicted concurrently is left alone.
    pub fn remove_if_stale(
        &self,
        address: &str,
        now: Instant,
        timeout: Duration,
    ) -> Option<DeviceHandle> {
        let mut devices = self.devices.lock();

        let stale = devices
            .get(address)
            .is_some_and(|handle| now.saturating_duration_since(handle.last_seen) > timeout);

        if stale {
            devices.remove(address)
        } else {
            None
        }
    }

    /// Record a successful reachability check
    ///
    /// Returns `false` if the device is no longer registered.
    pub fn mark_seen(&self, address: &str, at: Instant) -> bool {
        match self.devices.lock().get_mut(address) {
            Some(handle) => {
                if at > handle.last_seen {
                    handle.last_seen = at;
                }
                true
            }
            None => false,
        }
    }

    /// Last successful reachability check of a device
    pub fn last_seen(&self, address: &str) -> Option<Instant> {
        self.devices.lock().get(address).map(DeviceHandle::last_seen)
    }

    /// Copy of the registered addresses, for iterating without the lock
    pub fn snapshot_addresses(&self) -> HashSet<String> {
        self.devices.lock().keys().cloned().collect()
    }

    /// Views of all registered devices, sorted by address
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> =
            self.devices.lock().values().map(DeviceHandle::info).collect();
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        devices
    }

    /// Latest frame of one device
    pub fn snapshot(&self, address: &str) -> Option<FrameSnapshot> {
        self.devices.lock().get(address).map(DeviceHandle::snapshot)
    }

    /// Check if a device is registered
    pub fn contains(&self, address: &str) -> bool {
        self.devices.lock().contains_key(address)
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }

    /// Remove every device, handing the handles back for teardown
    pub fn drain(&self) -> Vec<DeviceHandle> {
        self.devices.lock().drain().map(|(_, handle)| handle).collect()
    }
}
