//! OS service integration: what a service is (a [`ServiceDescriptor`]), what
//! host managers do with one ([`ServiceHost`]), and what runs inside a
//! managed service once the host launches it ([`ServiceBody`]).
//!
//! The host manager sits behind a trait so every lifecycle path can run
//! against a recording fake in tests; production uses the systemd user
//! manager via [`systemd::SystemdUserHost`].

pub mod controller;
pub mod systemd;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::CmdError;

/// Which of the two bundled services a command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Database,
    Api,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Database => "database",
            ServiceKind::Api => "api",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration state as reported by the host manager. Always queried live,
/// never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    /// No registration visible to the host manager.
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Unknown => "not installed",
        })
    }
}

/// Everything a host manager needs to register a service.
///
/// Built fresh for every command invocation from the live configuration and
/// layout; the registration itself lives wherever the host keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unit name, unique per host manager.
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Executable the host launches, normally the current binary re-invoked
    /// in worker mode.
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Register in the per-user manager rather than the system one.
    pub user_service: bool,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{what} not found; {hint}")]
    MissingPrerequisite { what: String, hint: String },

    #[error("service '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("service manager unavailable: {reason}")]
    HostUnavailable { reason: String },

    #[error("writing service registration {path}: {source}")]
    Registration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("service manager command failed: {source}")]
    Manager {
        #[source]
        source: CmdError,
    },
}

/// Host-manager backend: raw registration and state transitions, no
/// convenience semantics. [`controller::ServiceController`] layers the
/// idempotent verb behavior on top.
pub trait ServiceHost {
    fn install(&self, descriptor: &ServiceDescriptor) -> Result<(), ServiceError>;

    /// Remove the registration. Returns [`ServiceError::NotRegistered`] when
    /// there is nothing to remove; the controller maps that to success.
    fn uninstall(&self, name: &str) -> Result<(), ServiceError>;

    fn start(&self, name: &str) -> Result<(), ServiceError>;

    fn stop(&self, name: &str) -> Result<(), ServiceError>;

    fn status(&self, name: &str) -> Result<ServiceStatus, ServiceError>;
}

/// What actually runs inside a managed service: the engine child process for
/// the database service, the embedded API server for the api service.
/// Driven by the worker loop in [`crate::worker`].
pub trait ServiceBody {
    /// Bring the payload up. Returns once it is launched, not when it exits.
    fn start(&mut self) -> Result<(), SuperviseError>;

    /// Graceful shutdown of the payload.
    fn stop(&mut self) -> Result<(), SuperviseError>;

    /// Whether the payload is still alive. Polled by the worker loop.
    fn is_running(&mut self) -> bool;
}

#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading admin secret {path}: {source}")]
    Secret {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("graceful shutdown failed: {source}")]
    Shutdown {
        #[source]
        source: CmdError,
    },

    #[error("api backend: {reason}")]
    Backend { reason: String },
}
