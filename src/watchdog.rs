//! Database connectivity watchdog for the API service.
//!
//! Probes on a fixed interval and tolerates transient failures; only an
//! unbroken run of failures ends the watch. Each probe runs on a helper
//! thread so a wedged connection attempt cannot stall the loop past its
//! per-probe budget.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

/// Connectivity check the watchdog drives. Implementations come from the
/// data-access side; [`crate::api::TcpProbe`] is the built-in one.
pub trait ConnectivityProbe: Send + Sync {
    fn check(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Pause between probes.
    pub interval: Duration,
    /// Budget for a single probe before it counts as failed.
    pub probe_timeout: Duration,
    /// Consecutive failures that end the watch.
    pub max_failures: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            max_failures: 3,
        }
    }
}

/// Outcome of recording one probe result.
#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Healthy,
    /// First success after at least one failure.
    Restored,
    Failing(u32),
    /// The consecutive-failure threshold is reached.
    Fatal,
}

/// Consecutive-failure counter. A single success resets it completely.
#[derive(Debug, Default)]
struct HealthState {
    consecutive_failures: u32,
}

impl HealthState {
    fn observe(&mut self, healthy: bool, max_failures: u32) -> Tick {
        if healthy {
            let restored = self.consecutive_failures > 0;
            self.consecutive_failures = 0;
            if restored {
                Tick::Restored
            } else {
                Tick::Healthy
            }
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= max_failures {
                Tick::Fatal
            } else {
                Tick::Failing(self.consecutive_failures)
            }
        }
    }
}

/// Probe until the failure threshold is reached, then return. The caller
/// decides the consequence; the service worker exits the process.
pub fn run(config: &WatchdogConfig, probe: Arc<dyn ConnectivityProbe>) {
    let mut state = HealthState::default();
    loop {
        thread::sleep(config.interval);

        let result = probe_once(config.probe_timeout, Arc::clone(&probe));
        let detail = result.as_ref().err().cloned().unwrap_or_default();
        match state.observe(result.is_ok(), config.max_failures) {
            Tick::Healthy => {}
            Tick::Restored => info!("database connectivity restored"),
            Tick::Failing(n) => warn!(
                attempt = n,
                max = config.max_failures,
                "connectivity check failed: {detail}"
            ),
            Tick::Fatal => {
                error!(
                    failures = config.max_failures,
                    "database connectivity lost: {detail}"
                );
                return;
            }
        }
    }
}

/// One probe with a hard budget. A probe that overruns keeps its helper
/// thread until it finishes on its own, but the loop moves on and counts
/// the attempt as failed.
fn probe_once(timeout: Duration, probe: Arc<dyn ConnectivityProbe>) -> Result<(), String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(probe.check());
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(_) => Err(format!("probe timed out after {timeout:?}")),
    }
}
