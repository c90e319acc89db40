//! Device manager configuration

use std::net::Ipv6Addr;
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::discovery::AddressFilter;

/// Device manager configuration options
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// URL scheme of device streams
    pub stream_scheme: String,

    /// Appended to the address to form the stream URL
    pub stream_path_suffix: String,

    /// Port that must accept connections before a feed is tried
    pub validation_port: u16,

    /// Timeout for pings and port probes
    pub probe_timeout: Duration,

    /// Timeout for the stream open during feed validation
    pub feed_open_timeout: Duration,

    /// Pause between discovery cycles
    pub discovery_interval: Duration,

    /// How long one discovery search may listen for announcements
    pub discovery_timeout: Duration,

    /// Pause between reachability batches
    pub reachability_tick_interval: Duration,

    /// Evict a device after this long without a successful ping
    pub ping_loss_timeout: Duration,

    /// Which discovered addresses are considered at all
    pub address_filter: AddressFilter,

    /// Maximum pings in flight
    pub reachability_concurrency: usize,

    /// Maximum feed validations in flight
    pub validation_concurrency: usize,

    /// How long to wait for a stopped capture worker before abandoning it
    pub actor_join_timeout: Duration,

    /// Settings for each device's capture worker
    pub capture: CaptureConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            stream_scheme: "rtsp".to_string(),
            stream_path_suffix: "/profile2/media.smp".to_string(),
            validation_port: 554,
            probe_timeout: Duration::from_secs(1),
            feed_open_timeout: Duration::from_secs(1),
            discovery_interval: Duration::from_secs(1),
            discovery_timeout: Duration::from_secs(1),
            reachability_tick_interval: Duration::from_millis(100),
            ping_loss_timeout: Duration::from_secs(3),
            address_filter: AddressFilter::Any,
            reachability_concurrency: 20,
            validation_concurrency: 50,
            actor_join_timeout: Duration::from_secs(1),
            capture: CaptureConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Set the stream URL scheme and path suffix
    pub fn stream_path(mut self, scheme: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.stream_scheme = scheme.into();
        self.stream_path_suffix = suffix.into();
        self
    }

    /// Set the port checked before opening a feed
    pub fn validation_port(mut self, port: u16) -> Self {
        self.validation_port = port;
        self
    }

    /// Set the ping and port probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the feed validation open timeout
    pub fn feed_open_timeout(mut self, timeout: Duration) -> Self {
        self.feed_open_timeout = timeout;
        self
    }

    /// Set the discovery interval
    pub fn discovery_interval(mut self, interval: Duration) -> Self {
        self.discovery_interval = interval;
        self
    }

    /// Set the discovery search timeout
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the pause between reachability batches
    pub fn reachability_tick_interval(mut self, interval: Duration) -> Self {
        self.reachability_tick_interval = interval;
        self
    }

    /// Set the eviction grace period
    pub fn ping_loss_timeout(mut self, timeout: Duration) -> Self {
        self.ping_loss_timeout = timeout;
        self
    }

    /// Restrict which discovered addresses are considered
    pub fn address_filter(mut self, filter: AddressFilter) -> Self {
        self.address_filter = filter;
        self
    }

    /// Set the ping worker pool size (at least 1)
    pub fn reachability_concurrency(mut self, workers: usize) -> Self {
        self.reachability_concurrency = workers.max(1);
        self
    }

    /// Set the feed validation worker pool size (at least 1)
    pub fn validation_concurrency(mut self, workers: usize) -> Self {
        self.validation_concurrency = workers.max(1);
        self
    }

    /// Set how long to wait for a stopping capture worker
    pub fn actor_join_timeout(mut self, timeout: Duration) -> Self {
        self.actor_join_timeout = timeout;
        self
    }

    /// Set the capture worker settings
    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Stream URL of the device at `address`
    ///
    /// IPv6 addresses are bracketed.
    pub fn stream_url(&self, address: &str) -> String {
        if address.parse::<Ipv6Addr>().is_ok() {
            format!("{}://[{}]{}", self.stream_scheme, address, self.stream_path_suffix)
        } else {
            format!("{}://{}{}", self.stream_scheme, address, self.stream_path_suffix)
        }
    }
}
