//! Watch a fixed set of devices and print their frame rates
//!
//! Run with: cargo run --example watch_fleet [--port PORT] ADDRESS...
//!
//! Examples:
//!   cargo run --example watch_fleet 192.168.1.20 192.168.1.21    # RTSP port 554
//!   cargo run --example watch_fleet --port 22 127.0.0.1          # any open TCP port works
//!
//! Reachability uses the system `ping`, and the stream port is checked with
//! a plain TCP connect. Frames come from a synthetic test-pattern decoder,
//! so no camera or codec library is needed to see the lifecycle at work:
//! unplug a device and it disappears after the ping loss timeout, plug it
//! back in and it is admitted again on the next discovery.
//!
//! Set `RUST_LOG=camfleet=debug` for lifecycle logs.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camfleet::{
    DeviceManager, Frame, FrameStream, ManagerConfig, OpenError, ReadError, StaticDiscovery,
    StreamOpener, SystemProber,
};

const PATTERN_WIDTH: u32 = 64;
const PATTERN_HEIGHT: u32 = 36;
const PATTERN_INTERVAL: Duration = Duration::from_millis(66);

/// Decoder stand-in producing a scrolling bar at about 15 fps
struct TestPattern;

impl StreamOpener for TestPattern {
    fn open(
        &self,
        _url: &str,
        _open_timeout: Duration,
        _read_timeout: Duration,
    ) -> Result<Arc<dyn FrameStream>, OpenError> {
        Ok(Arc::new(PatternStream {
            offset: AtomicU8::new(0),
            released: AtomicBool::new(false),
        }))
    }
}

struct PatternStream {
    offset: AtomicU8,
    released: AtomicBool,
}

impl FrameStream for PatternStream {
    fn read_frame(&self) -> Result<Frame, ReadError> {
        std::thread::sleep(PATTERN_INTERVAL);
        if self.released.load(Ordering::Acquire) {
            return Err(ReadError::Released);
        }

        let offset = self.offset.fetch_add(1, Ordering::Relaxed) as u32 % PATTERN_WIDTH;
        let mut data = Vec::with_capacity((PATTERN_WIDTH * PATTERN_HEIGHT * 3) as usize);
        for _y in 0..PATTERN_HEIGHT {
            for x in 0..PATTERN_WIDTH {
                let lit = (x + PATTERN_WIDTH - offset) % PATTERN_WIDTH < 8;
                let value = if lit { 255 } else { 32 };
                data.extend_from_slice(&[value, value, value]);
            }
        }

        Frame::new(PATTERN_WIDTH, PATTERN_HEIGHT, data)
            .map_err(|e| ReadError::Decode(e.to_string()))
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}

fn print_usage() {
    eprintln!("Usage: watch_fleet [--port PORT] ADDRESS...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  ADDRESS      Device address to watch (repeatable)");
    eprintln!("  --port PORT  Port that must accept connections (default: 554)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let mut port = 554u16;
    let mut addresses = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "--port" => match args.next().map(|p| p.parse::<u16>()) {
                Some(Ok(p)) => port = p,
                _ => {
                    eprintln!("Error: --port needs a number");
                    eprintln!();
                    print_usage();
                    std::process::exit(1);
                }
            },
            _ => addresses.push(arg),
        }
    }

    if addresses.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camfleet=info".parse()?)
                .add_directive("watch_fleet=info".parse()?),
        )
        .init();

    let config = ManagerConfig::default()
        .validation_port(port)
        .discovery_interval(Duration::from_secs(2))
        .reachability_tick_interval(Duration::from_millis(500));

    println!("Watching {} device(s), stream port {}", addresses.len(), port);
    println!();

    let manager = DeviceManager::new(
        config,
        Arc::new(StaticDiscovery::new(addresses)),
        Arc::new(SystemProber::new()),
        Arc::new(TestPattern),
    );
    manager.start()?;

    let mut report = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Shutting down...");
                break;
            }
            _ = report.tick() => {
                let devices = manager.registry().devices();
                if devices.is_empty() {
                    println!("no devices admitted yet");
                }
                for device in devices {
                    let snapshot = device.snapshot();
                    println!(
                        "{:<16} {:>5.1} fps  {}x{}  seen {:.1}s ago",
                        device.address,
                        snapshot.frame_rate,
                        snapshot.frame.width(),
                        snapshot.frame.height(),
                        device.last_seen.elapsed().as_secs_f64(),
                    );
                }
            }
        }
    }

    manager.stop().await;

    let stats = manager.stats();
    println!(
        "admitted {}, evicted {}, discovery cycles {}",
        stats.admitted, stats.evicted, stats.discovery_cycles
    );

    Ok(())
}
