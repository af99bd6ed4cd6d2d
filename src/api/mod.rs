//! API service: the pluggable web backend seam, its service descriptor, and
//! the connectivity probe the watchdog drives.
//!
//! The HTTP application itself lives in a collaborating crate and plugs in
//! through [`ApiBackend`]; what ships here is the lifecycle shell around it.

pub mod lifecycle;
pub mod server;

pub use server::ApiSupervisor;

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::config::{ApiConfig, DatabaseConfig};
use crate::service::ServiceDescriptor;
use crate::watchdog::ConnectivityProbe;

const DISPLAY_NAME: &str = "AppStack API";
const DESCRIPTION: &str = "Web API service for the AppStack bundle";

/// Descriptor for the API service: the current binary re-invoked in worker
/// mode. The unit name comes from configuration.
pub fn service_descriptor(api: &ApiConfig) -> Result<ServiceDescriptor> {
    let executable = std::env::current_exe().context("resolving current executable")?;
    Ok(ServiceDescriptor {
        name: api.name.clone(),
        display_name: DISPLAY_NAME.to_string(),
        description: DESCRIPTION.to_string(),
        executable,
        args: vec!["run".into(), "api".into()],
        user_service: true,
    })
}

/// The pluggable web application.
///
/// `serve` blocks on its calling thread until `shutdown` is called from
/// another one; both sides reach the backend through a shared `Arc`.
pub trait ApiBackend: Send + Sync {
    fn serve(&self, api: &ApiConfig) -> Result<()>;

    /// Unblock `serve` and release whatever it holds.
    fn shutdown(&self) -> Result<()>;
}

/// Stand-in backend: holds the service alive without serving anything.
/// The real application replaces it at integration time.
#[derive(Default)]
pub struct StubBackend {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApiBackend for StubBackend {
    fn serve(&self, api: &ApiConfig) -> Result<()> {
        info!(addr = %api.listen_addr(), "stub api backend up");
        let mut stopped = self
            .stopped
            .lock()
            .map_err(|_| anyhow!("backend state poisoned"))?;
        while !*stopped {
            stopped = self
                .signal
                .wait(stopped)
                .map_err(|_| anyhow!("backend state poisoned"))?;
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        let mut stopped = self
            .stopped
            .lock()
            .map_err(|_| anyhow!("backend state poisoned"))?;
        *stopped = true;
        self.signal.notify_all();
        Ok(())
    }
}

/// TCP-connect probe against the database address. The real application
/// swaps in a query-level probe through the same trait.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(db: &DatabaseConfig, timeout: Duration) -> Self {
        Self {
            addr: db.addr(),
            timeout,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn check(&self) -> Result<()> {
        let addrs: Vec<_> = self
            .addr
            .to_socket_addrs()
            .with_context(|| format!("resolving {}", self.addr))?
            .collect();
        let addr = addrs
            .first()
            .ok_or_else(|| anyhow!("{} resolves to no addresses", self.addr))?;

        TcpStream::connect_timeout(addr, self.timeout)
            .with_context(|| format!("connecting to {}", self.addr))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn probe_for(addr: &str) -> TcpProbe {
        TcpProbe {
            addr: addr.to_string(),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn probe_succeeds_against_a_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        probe_for(&addr.to_string()).check().unwrap();
    }

    #[test]
    fn probe_fails_against_a_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(probe_for(&addr.to_string()).check().is_err());
    }

    #[test]
    fn descriptor_takes_the_unit_name_from_config() {
        let api = ApiConfig::default();
        let descriptor = service_descriptor(&api).unwrap();

        assert_eq!(descriptor.name, api.name);
        assert_eq!(descriptor.args, vec!["run".to_string(), "api".to_string()]);
        assert!(descriptor.user_service);
    }
}
