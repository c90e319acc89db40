//! Feed validation
//!
//! A candidate is only admitted once it has shown it serves a stream:
//! first the stream port must accept a TCP connection, then the stream URL
//! must actually open. Whatever the outcome, the probe stream is released
//! before validation reports back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::capture::StreamOpener;
use crate::error::{OpenError, ValidationFailure};
use crate::manager::ManagerConfig;

use super::{NetworkProber, PROBE_GRACE};

/// An address and the stream URL it would be admitted with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub address: String,
    pub stream_url: String,
}

impl Candidate {
    pub fn new(address: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream_url: stream_url.into(),
        }
    }

    /// Candidate whose stream URL follows the manager configuration
    pub fn from_config(address: impl Into<String>, config: &ManagerConfig) -> Self {
        let address = address.into();
        let stream_url = config.stream_url(&address);
        Self {
            address,
            stream_url,
        }
    }
}

/// Two-stage check that a candidate really serves a decodable stream
#[derive(Clone)]
pub struct FeedValidator {
    prober: Arc<dyn NetworkProber>,
    opener: Arc<dyn StreamOpener>,
    port: u16,
    probe_timeout: Duration,
    open_timeout: Duration,
}

impl FeedValidator {
    /// Create a validator checking port 554 with one-second timeouts
    pub fn new(prober: Arc<dyn NetworkProber>, opener: Arc<dyn StreamOpener>) -> Self {
        Self {
            prober,
            opener,
            port: 554,
            probe_timeout: Duration::from_secs(1),
            open_timeout: Duration::from_secs(1),
        }
    }

    /// Create a validator using the manager's port and timeouts
    pub fn from_config(
        config: &ManagerConfig,
        prober: Arc<dyn NetworkProber>,
        opener: Arc<dyn StreamOpener>,
    ) -> Self {
        Self::new(prober, opener)
            .port(config.validation_port)
            .probe_timeout(config.probe_timeout)
            .open_timeout(config.feed_open_timeout)
    }

    /// Set the port checked before opening the feed
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the port probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the feed open timeout
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Validate one candidate
    pub async fn validate(&self, candidate: &Candidate) -> Result<(), ValidationFailure> {
        let probe = self.prober.probe_port(&candidate.address, self.port, self.probe_timeout);
        let port_open = tokio::time::timeout(self.probe_timeout + PROBE_GRACE, probe)
            .await
            .unwrap_or(false);
        if !port_open {
            return Err(ValidationFailure::PortClosed(self.port));
        }

        self.open_feed(&candidate.stream_url).await?;

        tracing::debug!(
            address = %candidate.address,
            url = %candidate.stream_url,
            "Feed validated"
        );
        Ok(())
    }

    /// Validate candidates concurrently, at most `concurrency` at a time
    ///
    /// Results come back in completion order.
    pub async fn validate_all(
        &self,
        candidates: Vec<Candidate>,
        concurrency: usize,
    ) -> Vec<(Candidate, Result<(), ValidationFailure>)> {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            let validator = self.clone();
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => validator.validate(&candidate).await,
                    Err(_) => Err(ValidationFailure::Feed(OpenError::Unavailable(
                        "validation pool closed".into(),
                    ))),
                };
                (candidate, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!(error = %e, "Feed validation task failed"),
            }
        }
        results
    }

    /// Validate a batch and keep the candidates that passed
    pub async fn scan(&self, candidates: Vec<Candidate>, concurrency: usize) -> Vec<Candidate> {
        let total = candidates.len();
        let found: Vec<Candidate> = self
            .validate_all(candidates, concurrency)
            .await
            .into_iter()
            .filter_map(|(candidate, result)| result.ok().map(|()| candidate))
            .collect();

        tracing::info!(scanned = total, feeds = found.len(), "Feed scan complete");
        found
    }

    /// Open the stream briefly on the blocking pool, then release it
    ///
    /// If the decoder overruns its timeout the check gives up, and the
    /// stream is released whenever the open finally returns.
    async fn open_feed(&self, url: &str) -> Result<(), OpenError> {
        let opener = Arc::clone(&self.opener);
        let owned_url = url.to_string();
        let open_timeout = self.open_timeout;

        let check = tokio::task::spawn_blocking(move || {
            opener
                .open(&owned_url, open_timeout, open_timeout)
                .map(|stream| stream.release())
        });

        match tokio::time::timeout(open_timeout + PROBE_GRACE, check).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(OpenError::Unavailable(format!("open task failed: {e}"))),
            Err(_) => {
                tracing::debug!(url = %url, "Feed open overran its timeout");
                Err(OpenError::Timeout(open_timeout))
            }
        }
    }
}

impl std::fmt::Debug for FeedValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedValidator")
            .field("port", &self.port)
            .field("probe_timeout", &self.probe_timeout)
            .field("open_timeout", &self.open_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::capture::{Frame, FrameStream};
    use crate::error::ReadError;

    use super::*;

    /// Port 554 is open on the listed hosts only
    struct OpenPorts(HashSet<&'static str>);

    #[async_trait]
    impl NetworkProber for OpenPorts {
        async fn ping(&self, _address: &str, _timeout: Duration) -> bool {
            true
        }

        async fn probe_port(&self, address: &str, port: u16, _timeout: Duration) -> bool {
            port == 554 && self.0.contains(address)
        }
    }

    struct CountingStream {
        released: Arc<AtomicUsize>,
    }

    impl FrameStream for CountingStream {
        fn read_frame(&self) -> Result<Frame, ReadError> {
            Err(ReadError::NoFrame)
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Opens URLs containing "good", optionally after a delay
    struct ScriptedOpener {
        delay: Duration,
        opened: AtomicUsize,
        released: Arc<AtomicUsize>,
    }

    impl ScriptedOpener {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                opened: AtomicUsize::new(0),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl StreamOpener for ScriptedOpener {
        fn open(
            &self,
            url: &str,
            _open_timeout: Duration,
            _read_timeout: Duration,
        ) -> Result<Arc<dyn FrameStream>, OpenError> {
            std::thread::sleep(self.delay);
            if !url.contains("good") {
                return Err(OpenError::Unavailable("no stream".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingStream {
                released: Arc::clone(&self.released),
            }))
        }
    }

    fn validator(opener: Arc<ScriptedOpener>) -> FeedValidator {
        let prober = Arc::new(OpenPorts(["10.0.0.1", "10.0.0.2"].into_iter().collect()));
        FeedValidator::new(prober, opener).open_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_closed_port_skips_open() {
        let opener = Arc::new(ScriptedOpener::new(Duration::ZERO));
        let validator = validator(opener.clone());

        let result = validator
            .validate(&Candidate::new("10.0.0.9", "rtsp://10.0.0.9/good"))
            .await;

        assert!(matches!(result, Err(ValidationFailure::PortClosed(554))));
        assert_eq!(opener.opened.load(Ordering::SeqCst), 0);
    }

    /// Port probe that never answers
    struct StuckPorts;

    #[async_trait]
    impl NetworkProber for StuckPorts {
        async fn ping(&self, _address: &str, _timeout: Duration) -> bool {
            true
        }

        async fn probe_port(&self, _address: &str, _port: u16, _timeout: Duration) -> bool {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_port_check_times_out() {
        let opener = Arc::new(ScriptedOpener::new(Duration::ZERO));
        let validator = FeedValidator::new(Arc::new(StuckPorts), opener.clone())
            .probe_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        let results = validator
            .validate_all(
                vec![
                    Candidate::new("10.0.0.1", "rtsp://10.0.0.1/good"),
                    Candidate::new("10.0.0.2", "rtsp://10.0.0.2/good"),
                ],
                2,
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|(_, result)| matches!(result, Err(ValidationFailure::PortClosed(554)))));
        assert_eq!(opener.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_feed_released() {
        let opener = Arc::new(ScriptedOpener::new(Duration::ZERO));
        let validator = validator(opener.clone());

        let result = validator
            .validate(&Candidate::new("10.0.0.1", "rtsp://10.0.0.1/good"))
            .await;

        assert!(result.is_ok());
        assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
        assert_eq!(opener.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unopenable_feed() {
        let opener = Arc::new(ScriptedOpener::new(Duration::ZERO));
        let validator = validator(opener);

        let result = validator
            .validate(&Candidate::new("10.0.0.2", "rtsp://10.0.0.2/bad"))
            .await;

        assert!(matches!(
            result,
            Err(ValidationFailure::Feed(OpenError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_slow_open_times_out_then_releases() {
        let opener = Arc::new(ScriptedOpener::new(Duration::from_millis(500)));
        let validator = validator(opener.clone());

        let result = validator
            .validate(&Candidate::new("10.0.0.1", "rtsp://10.0.0.1/good"))
            .await;
        assert!(matches!(
            result,
            Err(ValidationFailure::Feed(OpenError::Timeout(_)))
        ));

        // The abandoned open still cleans up after itself
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(opener.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scan_keeps_valid_feeds() {
        let opener = Arc::new(ScriptedOpener::new(Duration::ZERO));
        let validator = validator(opener);
        let config = ManagerConfig::default().stream_path("rtsp", "/good");

        let found = validator
            .scan(
                vec![
                    Candidate::from_config("10.0.0.1", &config),
                    Candidate::from_config("10.0.0.2", &config),
                    Candidate::from_config("10.0.0.3", &config),
                ],
                2,
            )
            .await;

        let mut addresses: Vec<_> = found.iter().map(|c| c.address.as_str()).collect();
        addresses.sort();
        assert_eq!(addresses, ["10.0.0.1", "10.0.0.2"]);
        assert_eq!(found[0].stream_url, format!("rtsp://{}/good", found[0].address));
    }

    #[test]
    fn test_from_config() {
        let config = ManagerConfig::default()
            .validation_port(8554)
            .feed_open_timeout(Duration::from_millis(750));
        let validator = FeedValidator::from_config(
            &config,
            Arc::new(OpenPorts(HashSet::new())),
            Arc::new(ScriptedOpener::new(Duration::ZERO)),
        );

        assert_eq!(validator.port, 8554);
        assert_eq!(validator.open_timeout, Duration::from_millis(750));
    }
}
