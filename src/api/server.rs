//! In-process API service body.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::error;

use crate::config::ApiConfig;
use crate::service::{ServiceBody, SuperviseError};

use super::ApiBackend;

/// Runs the pluggable backend on a background thread so the body's `start`
/// can return while the server keeps serving.
pub struct ApiSupervisor {
    backend: Arc<dyn ApiBackend>,
    api: ApiConfig,
    handle: Option<JoinHandle<()>>,
}

impl ApiSupervisor {
    pub fn new(backend: Arc<dyn ApiBackend>, api: ApiConfig) -> Self {
        Self {
            backend,
            api,
            handle: None,
        }
    }
}

impl ServiceBody for ApiSupervisor {
    fn start(&mut self) -> Result<(), SuperviseError> {
        let backend = Arc::clone(&self.backend);
        let api = self.api.clone();
        let handle = thread::Builder::new()
            .name("api-server".into())
            .spawn(move || {
                if let Err(err) = backend.serve(&api) {
                    error!("api backend exited: {err:#}");
                }
            })
            .map_err(|source| SuperviseError::Launch {
                program: "api-server".into(),
                source,
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SuperviseError> {
        self.backend.shutdown().map_err(|err| SuperviseError::Backend {
            reason: format!("{err:#}"),
        })?;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StubBackend;
    use anyhow::anyhow;
    use std::time::{Duration, Instant};

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn start_serves_until_stop() {
        let mut supervisor =
            ApiSupervisor::new(Arc::new(StubBackend::new()), ApiConfig::default());

        supervisor.start().unwrap();
        assert!(supervisor.is_running());

        supervisor.stop().unwrap();
        assert!(!supervisor.is_running());
    }

    #[test]
    fn a_crashed_backend_shows_up_as_not_running() {
        struct CrashingBackend;

        impl ApiBackend for CrashingBackend {
            fn serve(&self, _api: &ApiConfig) -> anyhow::Result<()> {
                Err(anyhow!("bind failed"))
            }

            fn shutdown(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let mut supervisor = ApiSupervisor::new(Arc::new(CrashingBackend), ApiConfig::default());
        supervisor.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || !supervisor.is_running()));
    }
}
