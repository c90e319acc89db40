//! Sliding-window frame rate estimate

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Arrival times of recent frames within a trailing window
///
/// The rate is the number of arrivals inside the window divided by the
/// window length, so it only reaches the true rate once a full window has
/// elapsed.
#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    arrivals: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            arrivals: VecDeque::new(),
        }
    }

    /// Record an arrival and return the updated rate
    pub fn record(&mut self, now: Instant) -> f64 {
        self.arrivals.push_back(now);
        self.prune(now);
        self.rate()
    }

    /// Drop arrivals older than the window
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.arrivals.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }
    }

    /// Current rate in arrivals per second
    pub fn rate(&self) -> f64 {
        if self.window.is_zero() {
            return 0.0;
        }
        self.arrivals.len() as f64 / self.window.as_secs_f64()
    }

    /// Number of arrivals currently inside the window
    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
