//! In-memory collaborators for driving the manager in tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use camfleet::{
    Discovery, DiscoveryError, Frame, FrameStream, NetworkProber, OpenError, ReadError,
    StreamOpener,
};
use parking_lot::{Condvar, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `condition` every 10ms until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Discovery answering with whatever the test last set
pub struct FakeDiscovery {
    answer: Mutex<Result<HashSet<String>, DiscoveryError>>,
    pub searches: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(addresses.iter().map(|a| a.to_string()).collect())),
            searches: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, addresses: &[&str]) {
        *self.answer.lock() = Ok(addresses.iter().map(|a| a.to_string()).collect());
    }

    pub fn fail(&self) {
        *self.answer.lock() = Err(DiscoveryError::Transport("multicast send failed".into()));
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn discover(&self, _timeout: Duration) -> Result<HashSet<String>, DiscoveryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.answer.lock().clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct Host {
    reachable: bool,
    port_open: bool,
}

/// Network of hosts whose ping and port state the test controls
#[derive(Default)]
pub struct FakeNetwork {
    hosts: Mutex<HashMap<String, Host>>,
    latency: Mutex<Duration>,
    pub pings: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a host that answers pings, with or without its stream port open
    pub fn add(&self, address: &str, port_open: bool) {
        self.hosts.lock().insert(
            address.to_string(),
            Host {
                reachable: true,
                port_open,
            },
        );
    }

    pub fn set_reachable(&self, address: &str, reachable: bool) {
        if let Some(host) = self.hosts.lock().get_mut(address) {
            host.reachable = reachable;
        }
    }

    pub fn set_port_open(&self, address: &str, open: bool) {
        if let Some(host) = self.hosts.lock().get_mut(address) {
            host.port_open = open;
        }
    }

    /// Delay every ping and port probe
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    fn host(&self, address: &str) -> Option<Host> {
        self.hosts.lock().get(address).copied()
    }
}

#[async_trait]
impl NetworkProber for FakeNetwork {
    async fn ping(&self, address: &str, _timeout: Duration) -> bool {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.host(address).is_some_and(|host| host.reachable)
    }

    async fn probe_port(&self, address: &str, _port: u16, _timeout: Duration) -> bool {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.host(address).is_some_and(|host| host.port_open)
    }
}

/// How streams opened by [`FakeDecoder`] behave
#[derive(Debug, Clone, Copy)]
pub enum StreamMode {
    /// A 4x4 frame every interval
    Steady(Duration),
    /// Reads block until the stream is released
    Hang,
    /// Reads block forever, even after release
    Wedged,
}

/// Decoder whose streams follow a [`StreamMode`]
pub struct FakeDecoder {
    mode: StreamMode,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl FakeDecoder {
    pub fn new(mode: StreamMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl StreamOpener for FakeDecoder {
    fn open(
        &self,
        _url: &str,
        _open_timeout: Duration,
        _read_timeout: Duration,
    ) -> Result<Arc<dyn FrameStream>, OpenError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeStream {
            mode: self.mode,
            released: Mutex::new(false),
            cond: Condvar::new(),
            release_count: Arc::clone(&self.released),
        }))
    }
}

struct FakeStream {
    mode: StreamMode,
    released: Mutex<bool>,
    cond: Condvar,
    release_count: Arc<AtomicUsize>,
}

impl FrameStream for FakeStream {
    fn read_frame(&self) -> Result<Frame, ReadError> {
        match self.mode {
            StreamMode::Steady(interval) => {
                let mut released = self.released.lock();
                if *released {
                    return Err(ReadError::Released);
                }
                let _ = self.cond.wait_for(&mut released, interval);
                if *released {
                    return Err(ReadError::Released);
                }
                Ok(Frame::new(4, 4, vec![128u8; 4 * 4 * 3]).expect("valid frame"))
            }
            StreamMode::Hang => {
                let mut released = self.released.lock();
                while !*released {
                    self.cond.wait(&mut released);
                }
                Err(ReadError::Released)
            }
            StreamMode::Wedged => loop {
                std::thread::park();
            },
        }
    }

    fn release(&self) {
        let mut released = self.released.lock();
        if !*released {
            *released = true;
            self.release_count.fetch_add(1, Ordering::SeqCst);
        }
        self.cond.notify_all();
    }
}
