//! Engine process supervision inside the managed service.
//!
//! `start` spawns the engine against the generated `engine.cnf`; `stop`
//! asks it to shut down through the admin client and only reaches for
//! SIGKILL when that fails. The worker loop polls `is_running` to notice an
//! engine that died on its own.

use std::fs;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::layout::InstallationLayout;
use crate::process::Cmd;
use crate::service::{ServiceBody, SuperviseError};

use super::LIBRARY_PATH_VAR;

/// How long a successfully requested shutdown may take before the engine
/// process gets killed anyway.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct EngineSupervisor {
    layout: InstallationLayout,
    child: Option<Child>,
}

impl EngineSupervisor {
    pub fn new(layout: InstallationLayout) -> Self {
        Self {
            layout,
            child: None,
        }
    }

    fn shutdown_command(&self) -> Result<(), SuperviseError> {
        let secret_path = self.layout.admin_secret();
        let secret = fs::read_to_string(&secret_path)
            .map(|s| s.trim().to_string())
            .map_err(|source| SuperviseError::Secret {
                path: secret_path,
                source,
            })?;

        Cmd::new(self.layout.admin_client())
            .args(["-u", "root"])
            .arg(format!("-p{secret}"))
            .arg("shutdown")
            .env(LIBRARY_PATH_VAR, self.layout.engine_lib_dir())
            .error_msg("engine shutdown command failed")
            .run()
            .map(|_| ())
            .map_err(|source| SuperviseError::Shutdown { source })
    }

    /// Wait for the spawned engine to exit on its own after a shutdown
    /// request; kill it when it misses the deadline.
    fn reap_child(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        let deadline = Instant::now() + SHUTDOWN_WAIT;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(_)) => {
                    self.child = None;
                    return;
                }
                Ok(None) => thread::sleep(SHUTDOWN_POLL),
                Err(_) => break,
            }
        }
        warn!("engine did not exit after shutdown request, killing it");
        self.kill_child();
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl ServiceBody for EngineSupervisor {
    fn start(&mut self) -> Result<(), SuperviseError> {
        let program = self.layout.engine_binary();
        let child = Command::new(&program)
            .arg(format!(
                "--defaults-file={}",
                self.layout.engine_config().display()
            ))
            .env(LIBRARY_PATH_VAR, self.layout.engine_lib_dir())
            .spawn()
            .map_err(|source| SuperviseError::Launch { program, source })?;

        info!(pid = child.id(), "engine started");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SuperviseError> {
        match self.shutdown_command() {
            Ok(()) => {
                self.reap_child();
                info!("engine stopped");
                Ok(())
            }
            Err(err) => {
                // The graceful path failed; force the process down but
                // report why graceful shutdown did not work.
                self.kill_child();
                Err(err)
            }
        }
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}
