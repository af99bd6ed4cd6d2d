//! Foreground execution of a managed service.
//!
//! The service manager launches the binary as `appstack run <kind>`; this
//! module is that entry point. It brings the service body up, watches for
//! termination signals and for a payload that died on its own, and for the
//! API service runs the database watchdog alongside.

use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info};

use crate::api::{ApiSupervisor, StubBackend, TcpProbe};
use crate::config::{self, AppConfig};
use crate::engine::supervisor::EngineSupervisor;
use crate::layout::InstallationLayout;
use crate::service::{ServiceBody, ServiceKind};
use crate::watchdog::{self, WatchdogConfig};

/// Poll cadence for signals and body liveness.
const POLL: Duration = Duration::from_millis(100);

/// Run a service in the foreground until it is told to stop or its payload
/// dies. This is what the unit files execute.
pub fn run(kind: ServiceKind, config: &AppConfig) -> Result<()> {
    let mut body: Box<dyn ServiceBody> = match kind {
        ServiceKind::Database => {
            let layout = InstallationLayout::new(config::base_dir()?);
            Box::new(EngineSupervisor::new(layout))
        }
        ServiceKind::Api => Box::new(ApiSupervisor::new(
            Arc::new(StubBackend::new()),
            config.api.clone(),
        )),
    };

    info!(service = %kind, "service starting");
    body.start()?;

    if kind == ServiceKind::Api {
        spawn_watchdog(config);
    }

    let mut signals = Signals::new([SIGTERM, SIGINT]).context("installing signal handlers")?;

    loop {
        if let Some(signal) = signals.pending().next() {
            info!(signal, "termination signal received");
            break;
        }
        if !body.is_running() {
            bail!("service payload exited unexpectedly");
        }
        thread::sleep(POLL);
    }

    body.stop().context("stopping service payload")?;
    info!(service = %kind, "service stopped");
    Ok(())
}

/// Database connectivity watchdog for the API service. Once connectivity is
/// gone for good the whole process goes down and the service manager's
/// restart policy takes over.
fn spawn_watchdog(config: &AppConfig) {
    let watchdog_config = WatchdogConfig::default();
    let probe = Arc::new(TcpProbe::new(
        &config.database,
        watchdog_config.probe_timeout,
    ));
    thread::spawn(move || {
        watchdog::run(&watchdog_config, probe);
        error!("terminating service: database connectivity lost");
        process::exit(1);
    });
}
