//! Statistics for the device fleet

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Fleet-wide counters, updated by the manager loops
#[derive(Debug)]
pub struct FleetStats {
    started_at: Instant,
    discovery_cycles: AtomicU64,
    discovery_failures: AtomicU64,
    validation_failures: AtomicU64,
    admitted: AtomicU64,
    admission_races: AtomicU64,
    evicted: AtomicU64,
    abandoned_workers: AtomicU64,
}

impl FleetStats {
    /// Create a zeroed stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            discovery_cycles: AtomicU64::new(0),
            discovery_failures: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            admission_races: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            abandoned_workers: AtomicU64::new(0),
        }
    }

    pub fn record_discovery_cycle(&self) {
        self.discovery_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovery_failure(&self) {
        self.discovery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A validated device lost the admission race to a concurrent admit
    pub fn record_admission_race(&self) {
        self.admission_races.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// A capture worker did not stop within its join timeout
    pub fn record_abandoned_worker(&self) {
        self.abandoned_workers.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> FleetStatsSnapshot {
        FleetStatsSnapshot {
            uptime: self.started_at.elapsed(),
            discovery_cycles: self.discovery_cycles.load(Ordering::Relaxed),
            discovery_failures: self.discovery_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            admission_races: self.admission_races.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            abandoned_workers: self.abandoned_workers.load(Ordering::Relaxed),
        }
    }
}

impl Default for FleetStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`FleetStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetStatsSnapshot {
    /// Time since the stats tracker was created
    pub uptime: Duration,
    /// Discovery searches started
    pub discovery_cycles: u64,
    /// Discovery searches that failed or timed out
    pub discovery_failures: u64,
    /// Candidates rejected by feed validation
    pub validation_failures: u64,
    /// Devices admitted to the registry
    pub admitted: u64,
    /// Validated devices dropped because the address was already registered
    pub admission_races: u64,
    /// Devices evicted after losing reachability
    pub evicted: u64,
    /// Capture workers abandoned after a join timeout
    pub abandoned_workers: u64,
}

impl FleetStatsSnapshot {
    /// Devices admitted and not yet evicted
    ///
    /// Does not account for devices drained at shutdown.
    pub fn active(&self) -> u64 {
        self.admitted.saturating_sub(self.evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_stats_new() {
        let stats = FleetStats::new().snapshot();
        assert_eq!(stats.discovery_cycles, 0);
        assert_eq!(stats.discovery_failures, 0);
        assert_eq!(stats.validation_failures, 0);
        assert_eq!(stats.admitted, 0);
        assert_eq!(stats.admission_races, 0);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.abandoned_workers, 0);
    }

    #[test]
    fn test_fleet_stats_counts() {
        let stats = FleetStats::new();
        stats.record_discovery_cycle();
        stats.record_discovery_cycle();
        stats.record_discovery_failure();
        stats.record_validation_failure();
        stats.record_admitted();
        stats.record_admitted();
        stats.record_admission_race();
        stats.record_evicted();
        stats.record_abandoned_worker();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.discovery_cycles, 2);
        assert_eq!(snapshot.discovery_failures, 1);
        assert_eq!(snapshot.validation_failures, 1);
        assert_eq!(snapshot.admitted, 2);
        assert_eq!(snapshot.admission_races, 1);
        assert_eq!(snapshot.evicted, 1);
        assert_eq!(snapshot.abandoned_workers, 1);
        assert_eq!(snapshot.active(), 1);
    }

    #[test]
    fn test_active_never_negative() {
        let snapshot = FleetStatsSnapshot {
            evicted: 3,
            ..Default::default()
        };
        assert_eq!(snapshot.active(), 0);
    }
}
