//! Per-device capture worker
//!
//! Each admitted device gets one OS thread that owns its decoder stream and
//! keeps pulling frames. Decoder reads block natively and may hang on a dead
//! connection, so the worker is not an async task.
//!
//! ```text
//!   CaptureActor ──force_stop()──► release stream ──► read_frame() fails fast
//!        │                                                   │
//!        │ snapshot()/reader()                               ▼
//!        └──────────── watch slot ◄── send_replace ── worker thread loop
//! ```
//!
//! The snapshot slot is a `watch` channel: the worker replaces the value,
//! readers clone it out and never wait on the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::error::{ReadError, Result};

use super::config::CaptureConfig;
use super::frame::{Frame, FrameSnapshot};
use super::rate::RateWindow;
use super::source::{FrameStream, StreamOpener};

/// State shared between the actor handle and its worker thread
struct Shared {
    stop: AtomicBool,
    stream: Mutex<Option<Arc<dyn FrameStream>>>,
}

impl Shared {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Take the open stream out of the slot and release it
    fn release_stream(&self) {
        let stream = self.stream.lock().take();
        if let Some(stream) = stream {
            stream.release();
        }
    }
}

/// Handle to a running capture worker
///
/// Dropping the handle force-stops the worker without waiting for it.
pub struct CaptureActor {
    url: String,
    shared: Arc<Shared>,
    snapshot_rx: watch::Receiver<FrameSnapshot>,
    done_rx: Option<oneshot::Receiver<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureActor {
    /// Spawn a worker thread for `url`
    ///
    /// The stream is opened on the worker thread, so this returns without
    /// touching the network.
    pub fn spawn(
        url: impl Into<String>,
        opener: Arc<dyn StreamOpener>,
        config: CaptureConfig,
    ) -> Result<Self> {
        let url = url.into();
        let (snapshot_tx, snapshot_rx) = watch::channel(FrameSnapshot::blank(
            config.frame_width,
            config.frame_height,
        ));
        let (done_tx, done_rx) = oneshot::channel();

        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            stream: Mutex::new(None),
        });

        let worker = Worker {
            url: url.clone(),
            opener,
            window: RateWindow::new(config.frame_rate_window),
            config,
            shared: Arc::clone(&shared),
            snapshot_tx,
        };

        let thread = thread::Builder::new()
            .name(thread_name(&url))
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            })?;

        tracing::debug!(url = %url, "Capture worker spawned");

        Ok(Self {
            url,
            shared,
            snapshot_rx,
            done_rx: Some(done_rx),
            thread: Some(thread),
        })
    }

    /// Stream URL this worker reads from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Latest published frame and frame rate
    ///
    /// Never waits on the worker. Before the first successful read this is a
    /// black frame with a rate of zero.
    pub fn snapshot(&self) -> FrameSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A cloneable reader over this worker's snapshot slot
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.snapshot_rx.clone(),
        }
    }

    /// Ask the worker to exit after its current read returns
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.wake();
    }

    /// Release the stream so a blocked read returns, then exit
    ///
    /// Unlike [`stop`](Self::stop) this does not depend on the decoder
    /// honouring its read timeout.
    pub fn force_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.release_stream();
        self.wake();
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait up to `timeout` for the worker thread to exit
    ///
    /// Returns `false` if it is still running. The caller may then abandon
    /// it; the thread exits on its own once its read returns.
    pub async fn join(&mut self, timeout: Duration) -> bool {
        let Some(done) = self.done_rx.as_mut() else {
            return true;
        };

        // A closed channel means the worker panicked, which also ends it
        if tokio::time::timeout(timeout, done).await.is_err() {
            return false;
        }

        self.done_rx = None;
        self.thread = None;
        true
    }

    fn wake(&self) {
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }
}

impl Drop for CaptureActor {
    fn drop(&mut self) {
        if !self.shared.stopped() {
            self.force_stop();
        }
    }
}

impl std::fmt::Debug for CaptureActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureActor")
            .field("url", &self.url)
            .field("stopped", &self.shared.stopped())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Read-only view of a capture worker's snapshot slot
///
/// Keeps working after the worker has gone, returning the last snapshot it
/// published.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<FrameSnapshot>,
}

impl SnapshotReader {
    /// Latest published frame and frame rate
    pub fn snapshot(&self) -> FrameSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next publish
    ///
    /// Returns `false` once the worker has exited and nothing new can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Thread name built from the stream host, e.g. `cap-10.0.0.21`
///
/// Linux keeps only the first 15 bytes of a thread name, so the scheme is
/// left out. Anything outside host characters is dropped.
fn thread_name(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host: String = rest
        .split('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '[' | ']'))
        .collect();
    format!("cap-{host}")
}

/// The worker side, moved onto the capture thread
struct Worker {
    url: String,
    opener: Arc<dyn StreamOpener>,
    config: CaptureConfig,
    shared: Arc<Shared>,
    snapshot_tx: watch::Sender<FrameSnapshot>,
    window: RateWindow,
}

impl Worker {
    fn run(mut self) {
        while !self.shared.stopped() {
            let stream = match self.current_stream() {
                Some(stream) => stream,
                None => {
                    if !self.open() {
                        self.pause(self.config.reopen_delay);
                    }
                    continue;
                }
            };

            let result = stream.read_frame();

            if self.shared.stopped() {
                break;
            }

            match result {
                Ok(frame) if frame.is_empty() => {
                    tracing::trace!(url = %self.url, "Decoder returned an empty frame");
                    self.pause(self.config.read_retry_delay);
                }
                Ok(frame) => self.publish(frame),
                Err(ReadError::Released) => {
                    tracing::debug!(url = %self.url, "Stream released by decoder, reopening");
                    self.shared.release_stream();
                    self.pause(self.config.read_retry_delay);
                }
                Err(e) => {
                    tracing::trace!(url = %self.url, error = %e, "Frame read failed");
                    self.pause(self.config.read_retry_delay);
                }
            }
        }

        self.shared.release_stream();
        tracing::debug!(url = %self.url, "Capture worker exited");
    }

    fn current_stream(&self) -> Option<Arc<dyn FrameStream>> {
        self.shared.stream.lock().clone()
    }

    /// Open the stream and park it in the shared slot
    fn open(&self) -> bool {
        let stream = match self.opener.open(
            &self.url,
            self.config.open_timeout,
            self.config.read_timeout,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Stream open failed");
                return false;
            }
        };

        let mut slot = self.shared.stream.lock();
        // A force stop that ran while we were opening found an empty slot
        if self.shared.stopped() {
            drop(slot);
            stream.release();
            return false;
        }
        *slot = Some(stream);
        drop(slot);

        tracing::debug!(url = %self.url, "Stream opened");
        true
    }

    fn publish(&mut self, frame: Frame) {
        let frame = frame.resized(self.config.frame_width, self.config.frame_height);
        let frame_rate = self.window.record(Instant::now());

        tracing::trace!(url = %self.url, frame_rate, "Frame published");
        self.snapshot_tx.send_replace(FrameSnapshot { frame, frame_rate });
    }

    /// Sleep, cut short by `stop`/`force_stop`
    fn pause(&self, delay: Duration) {
        if !self.shared.stopped() {
            thread::park_timeout(delay);
        }
    }
}
