//! Lifecycle commands for the database service, as invoked from the CLI.

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::layout::InstallationLayout;
use crate::migrate;
use crate::service::controller::ServiceController;
use crate::service::{ServiceError, ServiceHost, ServiceStatus};

use super::{config as engine_config, init, service_descriptor, SERVICE_NAME};

/// Register the engine service with the host manager. Requires an
/// initialized layout and regenerates the engine configuration every time,
/// so a changed port or moved base directory takes effect on reinstall.
pub fn install(
    host: &dyn ServiceHost,
    layout: &InstallationLayout,
    config: &AppConfig,
) -> Result<()> {
    println!("Installing database service...");

    if !layout.is_initialized() {
        return Err(ServiceError::MissingPrerequisite {
            what: format!("data directory {}", layout.data_dir().display()),
            hint: "run 'appstack database init' first".into(),
        }
        .into());
    }
    if !layout.engine_binary().exists() {
        return Err(ServiceError::MissingPrerequisite {
            what: format!("engine binary {}", layout.engine_binary().display()),
            hint: "run 'appstack database init' first".into(),
        }
        .into());
    }

    println!("  Generating engine configuration...");
    engine_config::generate(layout, &config.database)
        .context("generating engine configuration")?;

    let controller = ServiceController::new(host, service_descriptor()?);
    controller
        .install()
        .context("registering database service")?;

    println!("Database service '{SERVICE_NAME}' installed");
    Ok(())
}

pub fn uninstall(host: &dyn ServiceHost) -> Result<()> {
    println!("Uninstalling database service...");
    let controller = ServiceController::new(host, service_descriptor()?);
    controller.uninstall().context("removing database service")?;
    println!("Database service uninstalled");
    Ok(())
}

pub fn start(host: &dyn ServiceHost) -> Result<()> {
    println!("Starting database service...");
    let controller = ServiceController::new(host, service_descriptor()?);
    controller.start().context("starting database service")?;
    println!("Database service started");
    Ok(())
}

pub fn stop(host: &dyn ServiceHost) -> Result<()> {
    println!("Stopping database service...");
    let controller = ServiceController::new(host, service_descriptor()?);
    controller.stop().context("stopping database service")?;
    println!("Database service stopped");
    Ok(())
}

pub fn restart(host: &dyn ServiceHost) -> Result<()> {
    println!("Restarting database service...");
    let controller = ServiceController::new(host, service_descriptor()?);
    controller.restart().context("restarting database service")?;
    println!("Database service restarted");
    Ok(())
}

pub fn status(host: &dyn ServiceHost) -> Result<ServiceStatus> {
    let controller = ServiceController::new(host, service_descriptor()?);
    let status = controller
        .status()
        .context("querying database service status")?;
    println!("Database service status: {status}");
    Ok(status)
}

/// One-command bring-up: initialize, register, start, migrate.
pub fn deploy(
    host: &dyn ServiceHost,
    layout: &InstallationLayout,
    config: &AppConfig,
) -> Result<()> {
    println!("Deploying database...");
    init::initialize(layout, &config.database)?;
    install(host, layout, config)?;
    start(host)?;
    migrate::migrate(&config.database)?;
    println!("Database deployed");
    Ok(())
}
