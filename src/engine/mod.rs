//! Embedded database engine: first-run initialization, configuration
//! generation, process supervision, and the lifecycle commands gluing them
//! together.

pub mod config;
pub mod init;
pub mod lifecycle;
pub mod supervisor;

use anyhow::{Context, Result};

use crate::service::ServiceDescriptor;

/// Unit name of the managed engine service.
pub const SERVICE_NAME: &str = "appstack-database";

const DISPLAY_NAME: &str = "AppStack Database";
const DESCRIPTION: &str = "Embedded database engine for the AppStack bundle";

/// Variable the dynamic linker reads for extra library directories; the
/// engine ships its own `lib/`.
#[cfg(target_os = "macos")]
pub(crate) const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(not(target_os = "macos"))]
pub(crate) const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Descriptor for the engine service: the current binary re-invoked in
/// worker mode.
pub fn service_descriptor() -> Result<ServiceDescriptor> {
    let executable = std::env::current_exe().context("resolving current executable")?;
    Ok(ServiceDescriptor {
        name: SERVICE_NAME.to_string(),
        display_name: DISPLAY_NAME.to_string(),
        description: DESCRIPTION.to_string(),
        executable,
        args: vec!["run".into(), "database".into()],
        user_service: true,
    })
}
