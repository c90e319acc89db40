//! Probes backed by the operating system
//!
//! Ping shells out to the platform `ping` binary (raw ICMP sockets need
//! privileges); the port probe is a plain TCP connect.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

use super::{NetworkProber, PROBE_GRACE};

/// [`NetworkProber`] using the system `ping` command and TCP connects
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

impl SystemProber {
    pub fn new() -> Self {
        Self
    }

    /// `-W` takes whole seconds, at least one
    fn wait_secs(wait: Duration) -> u64 {
        (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
    }

    /// Build the single-echo ping command for this platform
    fn ping_command(address: &str, wait: Duration) -> Command {
        let mut cmd = Command::new("ping");

        if cfg!(windows) {
            let millis = wait.as_millis().max(1);
            cmd.args(["-n", "1", "-w", &millis.to_string()]);
        } else {
            cmd.args(["-c", "1", "-W", &Self::wait_secs(wait).to_string()]);
        }

        cmd.arg(address)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl NetworkProber for SystemProber {
    async fn ping(&self, address: &str, wait: Duration) -> bool {
        let mut cmd = Self::ping_command(address, wait);
        let deadline = if cfg!(windows) {
            wait
        } else {
            Duration::from_secs(Self::wait_secs(wait))
        };

        match timeout(deadline + PROBE_GRACE, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "Failed to run ping");
                false
            }
            Err(_) => false,
        }
    }

    async fn probe_port(&self, address: &str, port: u16, wait: Duration) -> bool {
        matches!(
            timeout(wait, TcpStream::connect((address, port))).await,
            Ok(Ok(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let open = SystemProber::new()
            .probe_port("127.0.0.1", port, Duration::from_secs(1))
            .await;
        assert!(open);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let open = SystemProber::new()
            .probe_port("127.0.0.1", port, Duration::from_secs(1))
            .await;
        assert!(!open);
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host() {
        let open = SystemProber::new()
            .probe_port("host.invalid", 554, Duration::from_millis(500))
            .await;
        assert!(!open);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_ping_wait_rounds_up_to_seconds() {
        let cmd = SystemProber::ping_command("10.0.0.1", Duration::from_millis(1500));
        let args: Vec<_> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args, ["-c", "1", "-W", "2", "10.0.0.1"]);
    }
}
