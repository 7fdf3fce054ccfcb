//! Targets: what the browser points at
//!
//! A flow either pins its own base URL (a live public site) or runs
//! against a locally spawned fixture site. The fixture is a sibling
//! binary managed like any server under test: spawn, poll `/health`
//! until ready, SIGTERM on stop.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Handle to a running fixture site process
pub struct FixtureHandle {
    child: Child,
    base_url: String,
    pub port: u16,
}

impl FixtureHandle {
    /// Spawn the fixture binary and wait until it answers health checks
    pub async fn spawn(config: FixtureConfig) -> HarnessResult<Self> {
        let port = config.port.unwrap_or_else(find_free_port);
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning fixture site on port {}", port);

        let mut cmd = Command::new(&config.binary_path);
        cmd.env("SEARCHFLOW_FIXTURE_ADDR", format!("127.0.0.1:{}", port))
            .env("SEARCHFLOW_FIXTURE_ASSETS", &config.assets_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            HarnessError::FixtureStartup(format!(
                "failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = FixtureHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Fixture site is healthy at {}", base_url);
        Ok(handle)
    }

    /// Poll `/health` until the site responds or the timeout elapses
    async fn wait_for_healthy(&self, timeout: Duration) -> HarnessResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("Fixture health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for fixture site to start...");
                    }
                    // Connection refused is expected while the site is starting
                    if !e.is_connect() {
                        warn!("Fixture health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(HarnessError::FixtureHealthCheck(attempts))
    }

    /// Base URL hermetic flows inherit
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the fixture site
    pub fn stop(&mut self) -> HarnessResult<()> {
        info!("Stopping fixture site (pid: {})", self.child.id());

        // Graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for FixtureHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning the fixture site
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Path to the searchflow-fixture binary
    pub binary_path: PathBuf,

    /// Directory containing the fixture pages
    pub assets_dir: PathBuf,

    /// Port to listen on (None = find a free port)
    pub port: Option<u16>,

    /// Timeout for fixture startup
    pub startup_timeout: Duration,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("target/debug/searchflow-fixture"),
            assets_dir: PathBuf::from("crates/fixture/assets"),
            port: None,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

/// Preflight for live flows: confirm the pinned base URL answers at all
/// before spending a browser launch on it.
pub async fn check_reachable(url: &str) -> HarnessResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    match client.get(url).send().await {
        Ok(_) => Ok(()),
        Err(e) => Err(HarnessError::TargetUnreachable {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Find a free port to use
fn find_free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to find free port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port();
        let port2 = find_free_port();

        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn test_fixture_config_default() {
        let config = FixtureConfig::default();
        assert!(config.port.is_none());
        assert_eq!(config.startup_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_is_startup_error() {
        let config = FixtureConfig {
            binary_path: PathBuf::from("/no/such/searchflow-fixture"),
            ..Default::default()
        };

        match FixtureHandle::spawn(config).await {
            Err(HarnessError::FixtureStartup(msg)) => {
                assert!(msg.contains("/no/such/searchflow-fixture"));
            }
            other => panic!("expected FixtureStartup, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unreachable_target_is_reported() {
        // Port 1 on loopback refuses connections immediately.
        let err = check_reachable("http://127.0.0.1:1").await.unwrap_err();
        match err {
            HarnessError::TargetUnreachable { url, .. } => {
                assert_eq!(url, "http://127.0.0.1:1");
            }
            other => panic!("expected TargetUnreachable, got {:?}", other),
        }
    }
}
