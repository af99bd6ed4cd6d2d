//! Lifecycle commands for the API service, as invoked from the CLI.

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::service::controller::ServiceController;
use crate::service::{ServiceHost, ServiceKind, ServiceStatus};
use crate::worker;

use super::service_descriptor;

/// Run the API server in the foreground, the same path the managed service
/// takes.
pub fn serve(config: &AppConfig) -> Result<()> {
    worker::run(ServiceKind::Api, config)
}

pub fn install(host: &dyn ServiceHost, config: &AppConfig) -> Result<()> {
    println!("Installing API service...");
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    controller.install().context("registering api service")?;
    println!("API service '{}' installed", config.api.name);
    Ok(())
}

pub fn uninstall(host: &dyn ServiceHost, config: &AppConfig) -> Result<()> {
    println!("Uninstalling API service...");
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    controller.uninstall().context("removing api service")?;
    println!("API service uninstalled");
    Ok(())
}

pub fn start(host: &dyn ServiceHost, config: &AppConfig) -> Result<()> {
    println!("Starting API service...");
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    controller.start().context("starting api service")?;
    println!("API service started");
    Ok(())
}

pub fn stop(host: &dyn ServiceHost, config: &AppConfig) -> Result<()> {
    println!("Stopping API service...");
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    controller.stop().context("stopping api service")?;
    println!("API service stopped");
    Ok(())
}

pub fn restart(host: &dyn ServiceHost, config: &AppConfig) -> Result<()> {
    println!("Restarting API service...");
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    controller.restart().context("restarting api service")?;
    println!("API service restarted");
    Ok(())
}

pub fn status(host: &dyn ServiceHost, config: &AppConfig) -> Result<ServiceStatus> {
    let controller = ServiceController::new(host, service_descriptor(&config.api)?);
    let status = controller.status().context("querying api service status")?;
    println!("API service status: {status}");
    Ok(status)
}
