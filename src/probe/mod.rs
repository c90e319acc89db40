//! Reachability and feed probes
//!
//! - [`NetworkProber`]: single ping and port checks against one address
//! - [`probe_all`]: ping a batch of addresses through a bounded worker pool
//! - [`FeedValidator`]: port check followed by a short stream open

pub mod system;
pub mod validator;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub use system::SystemProber;
pub use validator::{Candidate, FeedValidator};

/// Slack allowed on top of a probe's own timeout before it is cut off
pub const PROBE_GRACE: Duration = Duration::from_millis(250);

/// Network checks against a single address
///
/// Both checks answer `false` on any failure rather than erroring.
#[async_trait]
pub trait NetworkProber: Send + Sync {
    /// Is the host answering reachability checks (echo request)?
    async fn ping(&self, address: &str, timeout: Duration) -> bool;

    /// Does the host accept TCP connections on `port`?
    async fn probe_port(&self, address: &str, port: u16, timeout: Duration) -> bool;
}

/// Ping every address concurrently, at most `concurrency` at a time
///
/// The batch takes about as long as its slowest probe when `concurrency`
/// covers all addresses. Each probe is cut off at `timeout` plus
/// [`PROBE_GRACE`]; a probe that times out or panics counts as unreachable.
pub async fn probe_all(
    prober: Arc<dyn NetworkProber>,
    addresses: HashSet<String>,
    concurrency: usize,
    timeout: Duration,
) -> HashMap<String, bool> {
    let mut results: HashMap<String, bool> =
        addresses.iter().map(|address| (address.clone(), false)).collect();

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for address in addresses {
        let prober = Arc::clone(&prober);
        let permits = Arc::clone(&permits);

        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return (address, false);
            };
            let alive = tokio::time::timeout(timeout + PROBE_GRACE, prober.ping(&address, timeout))
                .await
                .unwrap_or(false);
            (address, alive)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((address, alive)) => {
                results.insert(address, alive);
            }
            Err(e) => tracing::warn!(error = %e, "Reachability probe task failed"),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    /// Every ping takes `latency`; addresses starting with "up" answer
    struct SlowProber {
        latency: Duration,
    }

    #[async_trait]
    impl NetworkProber for SlowProber {
        async fn ping(&self, address: &str, _timeout: Duration) -> bool {
            tokio::time::sleep(self.latency).await;
            address.starts_with("up")
        }

        async fn probe_port(&self, _address: &str, _port: u16, _timeout: Duration) -> bool {
            false
        }
    }

    /// Never answers
    struct StuckProber;

    #[async_trait]
    impl NetworkProber for StuckProber {
        async fn ping(&self, _address: &str, _timeout: Duration) -> bool {
            std::future::pending().await
        }

        async fn probe_port(&self, _address: &str, _port: u16, _timeout: Duration) -> bool {
            std::future::pending().await
        }
    }

    fn addresses(n: usize) -> HashSet<String> {
        (0..n)
            .map(|i| if i % 2 == 0 { format!("up-{i}") } else { format!("down-{i}") })
            .collect()
    }

    #[tokio::test]
    async fn test_results_per_address() {
        let prober = Arc::new(SlowProber {
            latency: Duration::from_millis(1),
        });

        let results = probe_all(prober, addresses(6), 4, Duration::from_secs(1)).await;

        assert_eq!(results.len(), 6);
        assert!(results["up-0"]);
        assert!(!results["down-1"]);
    }

    #[tokio::test]
    async fn test_parallel_latency() {
        let latency = Duration::from_millis(200);
        let prober = Arc::new(SlowProber { latency });

        let started = Instant::now();
        let results = probe_all(prober, addresses(20), 20, Duration::from_secs(1)).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 20);
        assert!(elapsed >= latency);
        assert!(elapsed < latency * 3, "batch took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let latency = Duration::from_millis(100);
        let prober = Arc::new(SlowProber { latency });

        // 8 probes through 2 workers need 4 rounds
        let started = Instant::now();
        probe_all(prober, addresses(8), 2, Duration::from_secs(1)).await;

        assert!(started.elapsed() >= latency * 4);
    }

    #[tokio::test]
    async fn test_stuck_probe_times_out() {
        let started = Instant::now();
        let results = probe_all(
            Arc::new(StuckProber),
            addresses(3),
            3,
            Duration::from_millis(50),
        )
        .await;

        assert!(results.values().all(|alive| !alive));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = probe_all(
            Arc::new(StuckProber),
            HashSet::new(),
            20,
            Duration::from_millis(50),
        )
        .await;

        assert!(results.is_empty());
    }
}
