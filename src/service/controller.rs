//! Uniform lifecycle verbs over any [`ServiceHost`].
//!
//! Every verb is safe to repeat: starts and stops check live status first
//! and skip the host call when there is nothing to do, uninstall treats a
//! missing registration as success, restart only stops what is actually
//! running.

use tracing::warn;

use super::{ServiceDescriptor, ServiceError, ServiceHost, ServiceStatus};

pub struct ServiceController<'a> {
    host: &'a dyn ServiceHost,
    descriptor: ServiceDescriptor,
}

impl<'a> ServiceController<'a> {
    pub fn new(host: &'a dyn ServiceHost, descriptor: ServiceDescriptor) -> Self {
        Self { host, descriptor }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Register with the host manager. Does not start anything.
    pub fn install(&self) -> Result<(), ServiceError> {
        self.host.install(&self.descriptor)
    }

    /// Remove the registration. A service that was never installed counts
    /// as success; a running one is stopped first on a best-effort basis.
    pub fn uninstall(&self) -> Result<(), ServiceError> {
        if matches!(self.status(), Ok(ServiceStatus::Running)) {
            if let Err(err) = self.host.stop(self.name()) {
                warn!(
                    service = self.name(),
                    "stop before uninstall failed, removing registration anyway: {err}"
                );
            }
        }
        match self.host.uninstall(self.name()) {
            Err(ServiceError::NotRegistered { .. }) => Ok(()),
            other => other,
        }
    }

    /// Start unless already running.
    pub fn start(&self) -> Result<(), ServiceError> {
        if matches!(self.status(), Ok(ServiceStatus::Running)) {
            return Ok(());
        }
        self.host.start(self.name())
    }

    /// Stop unless already stopped.
    pub fn stop(&self) -> Result<(), ServiceError> {
        if matches!(self.status(), Ok(ServiceStatus::Stopped)) {
            return Ok(());
        }
        self.host.stop(self.name())
    }

    /// Stop (when running) then start. A failed stop is logged rather than
    /// fatal; the subsequent start decides the outcome.
    pub fn restart(&self) -> Result<(), ServiceError> {
        if matches!(self.status(), Ok(ServiceStatus::Running)) {
            if let Err(err) = self.host.stop(self.name()) {
                warn!(service = self.name(), "stop before restart failed: {err}");
            }
        }
        self.host.start(self.name())
    }

    /// Live status from the host manager.
    pub fn status(&self) -> Result<ServiceStatus, ServiceError> {
        self.host.status(self.name())
    }
}
