//! Device lifecycle manager
//!
//! Runs the discovery loop and the reachability loop over one shared
//! registry. Either loop can also be driven one cycle at a time.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureActor, StreamOpener};
use crate::discovery::Discovery;
use crate::error::{DiscoveryError, Error, Result};
use crate::probe::{probe_all, Candidate, FeedValidator, NetworkProber, PROBE_GRACE};
use crate::registry::{DeviceHandle, DeviceRegistry};
use crate::stats::{FleetStats, FleetStatsSnapshot};

use super::config::ManagerConfig;

/// Owns the registry and the two loops that keep it current
pub struct DeviceManager {
    inner: Arc<Inner>,
    running: Mutex<Option<Running>>,
}

/// Handles of the spawned loops
struct Running {
    shutdown: CancellationToken,
    discovery: JoinHandle<()>,
    reachability: JoinHandle<()>,
}

struct Inner {
    config: ManagerConfig,
    registry: Arc<DeviceRegistry>,
    discovery: Arc<dyn Discovery>,
    prober: Arc<dyn NetworkProber>,
    opener: Arc<dyn StreamOpener>,
    validator: FeedValidator,
    stats: FleetStats,
}

impl DeviceManager {
    /// Create a manager with a fresh registry
    pub fn new(
        config: ManagerConfig,
        discovery: Arc<dyn Discovery>,
        prober: Arc<dyn NetworkProber>,
        opener: Arc<dyn StreamOpener>,
    ) -> Self {
        Self::with_registry(
            config,
            Arc::new(DeviceRegistry::new()),
            discovery,
            prober,
            opener,
        )
    }

    /// Create a manager over an existing registry
    pub fn with_registry(
        config: ManagerConfig,
        registry: Arc<DeviceRegistry>,
        discovery: Arc<dyn Discovery>,
        prober: Arc<dyn NetworkProber>,
        opener: Arc<dyn StreamOpener>,
    ) -> Self {
        let validator =
            FeedValidator::from_config(&config, Arc::clone(&prober), Arc::clone(&opener));

        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                discovery,
                prober,
                opener,
                validator,
                stats: FleetStats::new(),
            }),
            running: Mutex::new(None),
        }
    }

    /// Get a reference to the device registry
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    /// Get the manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Current fleet counters
    pub fn stats(&self) -> FleetStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Whether the loops have been started and not stopped
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Spawn the discovery and reachability loops
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let mut running = self.running.lock();

        if running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let shutdown = CancellationToken::new();
        let discovery =
            runtime.spawn(Arc::clone(&self.inner).discovery_loop(shutdown.child_token()));
        let reachability =
            runtime.spawn(Arc::clone(&self.inner).reachability_loop(shutdown.child_token()));

        *running = Some(Running {
            shutdown,
            discovery,
            reachability,
        });

        let config = &self.inner.config;
        tracing::info!(
            discovery_interval_ms = config.discovery_interval.as_millis() as u64,
            reachability_tick_ms = config.reachability_tick_interval.as_millis() as u64,
            ping_loss_timeout_ms = config.ping_loss_timeout.as_millis() as u64,
            filter = %config.address_filter,
            "Device manager started"
        );
        Ok(())
    }

    /// Stop both loops, then tear down every registered device
    ///
    /// Workers that do not stop within `actor_join_timeout` are abandoned.
    /// Devices admitted by manual cycles are torn down too, so this is
    /// also the way to clean up a manager that was never started.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.shutdown.cancel();
            for task in [running.discovery, running.reachability] {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        tracing::error!(error = %e, "Manager loop panicked");
                    }
                }
            }
        }

        let devices = self.inner.registry.drain();
        let count = devices.len();

        // Release every stream first so the workers wind down in parallel
        for device in &devices {
            device.actor().force_stop();
        }
        self.inner.teardown(devices).await;

        tracing::info!(devices = count, "Device manager stopped");
    }

    /// Run one discovery cycle now
    ///
    /// Returns how many devices were admitted.
    pub async fn run_discovery_cycle(&self) -> std::result::Result<usize, DiscoveryError> {
        self.inner.discovery_cycle().await
    }

    /// Run one reachability batch now
    ///
    /// Returns how many devices were evicted.
    pub async fn run_reachability_cycle(&self) -> usize {
        self.inner.reachability_cycle().await
    }

    /// Validate addresses once without admitting them
    ///
    /// Addresses outside the configured filter are skipped. Returns the
    /// candidates whose feed validated.
    pub async fn scan<I, S>(&self, addresses: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = &self.inner.config;
        let candidates = addresses
            .into_iter()
            .map(|address| -> String { address.into() })
            .filter(|address| config.address_filter.permits(address))
            .map(|address| Candidate::from_config(address, config))
            .collect();

        self.inner
            .validator
            .scan(candidates, config.validation_concurrency)
            .await
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.cancel();
        }
    }
}

impl Inner {
    async fn discovery_loop(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::debug!("Discovery loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.discovery_cycle() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Discovery failed");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.discovery_interval) => {}
            }
        }

        tracing::debug!("Discovery loop stopped");
    }

    async fn reachability_loop(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::debug!("Reachability loop started");

        while !shutdown.is_cancelled() {
            // A started batch runs to the end so evicted workers get joined.
            // It is bounded by the probe and join timeouts.
            self.reachability_cycle().await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reachability_tick_interval) => {}
            }
        }

        tracing::debug!("Reachability loop stopped");
    }

    /// Discover, filter, validate and admit new devices
    async fn discovery_cycle(&self) -> std::result::Result<usize, DiscoveryError> {
        self.stats.record_discovery_cycle();

        let timeout = self.config.discovery_timeout;
        let search = self.discovery.discover(timeout);
        let found = match tokio::time::timeout(timeout + PROBE_GRACE, search).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                self.stats.record_discovery_failure();
                return Err(e);
            }
            Err(_) => {
                self.stats.record_discovery_failure();
                return Err(DiscoveryError::Timeout(timeout));
            }
        };

        let known = self.registry.snapshot_addresses();
        let candidates: Vec<Candidate> = found
            .into_iter()
            .filter(|address| self.config.address_filter.permits(address))
            .filter(|address| !known.contains(address))
            .map(|address| Candidate::from_config(address, &self.config))
            .collect();

        if candidates.is_empty() {
            return Ok(0);
        }

        tracing::debug!(candidates = candidates.len(), "Validating new candidates");

        let results = self
            .validator
            .validate_all(candidates, self.config.validation_concurrency)
            .await;

        let mut admitted = 0;
        for (candidate, result) in results {
            match result {
                Ok(()) => {
                    if self.admit(candidate).await {
                        admitted += 1;
                    }
                }
                Err(e) => {
                    self.stats.record_validation_failure();
                    tracing::debug!(address = %candidate.address, error = %e, "Candidate rejected");
                }
            }
        }

        Ok(admitted)
    }

    /// Start a capture worker for a validated candidate and register it
    async fn admit(&self, candidate: Candidate) -> bool {
        let actor = match CaptureActor::spawn(
            candidate.stream_url.clone(),
            Arc::clone(&self.opener),
            self.config.capture.clone(),
        ) {
            Ok(actor) => actor,
            Err(e) => {
                tracing::error!(
                    address = %candidate.address,
                    error = %e,
                    "Failed to start capture worker"
                );
                return false;
            }
        };

        let handle = DeviceHandle::new(candidate.address, candidate.stream_url, actor);
        match self.registry.try_admit(handle) {
            Ok(()) => {
                self.stats.record_admitted();
                true
            }
            Err(duplicate) => {
                tracing::debug!(
                    address = %duplicate.address,
                    "Device already registered, discarding worker"
                );
                self.stats.record_admission_race();
                if !duplicate.shutdown(self.config.actor_join_timeout).await {
                    self.stats.record_abandoned_worker();
                }
                false
            }
        }
    }

    /// Ping every registered device and evict those silent for too long
    async fn reachability_cycle(&self) -> usize {
        let addresses = self.registry.snapshot_addresses();
        if addresses.is_empty() {
            return 0;
        }

        let results = probe_all(
            Arc::clone(&self.prober),
            addresses,
            self.config.reachability_concurrency,
            self.config.probe_timeout,
        )
        .await;

        let now = Instant::now();
        let mut stale = Vec::new();

        for (address, alive) in results {
            if alive {
                self.registry.mark_seen(&address, now);
                continue;
            }

            let stale_handle = self
                .registry
                .remove_if_stale(&address, now, self.config.ping_loss_timeout);
            if let Some(handle) = stale_handle {
                let silent = now.saturating_duration_since(handle.last_seen());
                tracing::info!(
                    address = %handle.address,
                    silent_ms = silent.as_millis() as u64,
                    "Device unreachable, evicting"
                );
                self.stats.record_evicted();
                stale.push(handle);
            }
        }

        let evicted = stale.len();
        self.teardown(stale).await;
        evicted
    }

    /// Shut down removed devices concurrently, each with the join timeout
    async fn teardown(&self, devices: Vec<DeviceHandle>) {
        let timeout = self.config.actor_join_timeout;
        let mut tasks = JoinSet::new();

        for device in devices {
            tasks.spawn(device.shutdown(timeout));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => self.stats.record_abandoned_worker(),
                Err(e) => tracing::warn!(error = %e, "Device teardown task failed"),
            }
        }
    }
}
