//! appstack - self-contained service stack manager.
//!
//! One binary carries the database engine distribution, the schema
//! migration tool, and the API service shell, and manages all of them as
//! OS services:
//!
//! - Database lifecycle (`appstack database init|install|start|...`)
//! - Schema migrations (`appstack database migrate`)
//! - Dump and restore (`appstack database backup|restore`)
//! - API service lifecycle (`appstack api install|serve|...`)
//!
//! See `appstack --help` for full usage information.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use appstack::api;
use appstack::backup;
use appstack::config::{self, AppConfig};
use appstack::engine;
use appstack::layout::InstallationLayout;
use appstack::migrate;
use appstack::service::systemd::SystemdUserHost;
use appstack::service::{ServiceHost, ServiceKind};
use appstack::worker;

#[derive(Parser)]
#[command(name = "appstack")]
#[command(version)]
#[command(about = "Manage the bundled database engine and API as OS services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the embedded database engine
    #[command(subcommand)]
    Database(DatabaseCommands),

    /// Manage the API service
    #[command(subcommand)]
    Api(ApiCommands),

    /// Run a service payload in the foreground (invoked by the service
    /// manager, not meant for interactive use)
    #[command(hide = true)]
    Run {
        #[arg(value_parser = parse_service_kind)]
        kind: ServiceKind,
    },
}

#[derive(Subcommand)]
enum DatabaseCommands {
    /// Unpack the engine and create the application database and accounts
    Init,
    /// Register the database service with the service manager
    Install,
    /// Remove the database service registration
    Uninstall,
    /// Start the database service
    Start,
    /// Stop the database service
    Stop,
    /// Restart the database service
    Restart,
    /// Show the database service status
    Status,
    /// Apply pending schema migrations
    Migrate,
    /// Dump the application database to a timestamped file
    Backup,
    /// Replay a dump file into the application database
    Restore {
        /// Backup file produced by `appstack database backup`
        file: PathBuf,
    },
    /// Initialize, register, start, and migrate in one go
    Deploy,
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Run the API server in the foreground
    Serve,
    /// Register the API service with the service manager
    Install,
    /// Remove the API service registration
    Uninstall,
    /// Start the API service
    Start,
    /// Stop the API service
    Stop,
    /// Restart the API service
    Restart,
    /// Show the API service status
    Status,
}

fn parse_service_kind(value: &str) -> Result<ServiceKind, String> {
    match value {
        "database" => Ok(ServiceKind::Database),
        "api" => Ok(ServiceKind::Api),
        other => Err(format!("unknown service kind '{other}'")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let layout = InstallationLayout::new(config::base_dir()?);

    match cli.command {
        Commands::Database(cmd) => run_database(cmd, &layout, &config),
        Commands::Api(cmd) => run_api(cmd, &config),
        Commands::Run { kind } => worker::run(kind, &config),
    }
}

fn run_database(
    cmd: DatabaseCommands,
    layout: &InstallationLayout,
    config: &AppConfig,
) -> Result<()> {
    match cmd {
        DatabaseCommands::Init => Ok(engine::init::initialize(layout, &config.database)?),
        DatabaseCommands::Install => engine::lifecycle::install(host()?.as_ref(), layout, config),
        DatabaseCommands::Uninstall => engine::lifecycle::uninstall(host()?.as_ref()),
        DatabaseCommands::Start => engine::lifecycle::start(host()?.as_ref()),
        DatabaseCommands::Stop => engine::lifecycle::stop(host()?.as_ref()),
        DatabaseCommands::Restart => engine::lifecycle::restart(host()?.as_ref()),
        DatabaseCommands::Status => engine::lifecycle::status(host()?.as_ref()).map(|_| ()),
        DatabaseCommands::Migrate => Ok(migrate::migrate(&config.database)?),
        DatabaseCommands::Backup => backup::backup(layout, &config.database)
            .map(|_| ())
            .map_err(Into::into),
        DatabaseCommands::Restore { file } => {
            Ok(backup::restore(layout, &config.database, &file)?)
        }
        DatabaseCommands::Deploy => engine::lifecycle::deploy(host()?.as_ref(), layout, config),
    }
}

fn run_api(cmd: ApiCommands, config: &AppConfig) -> Result<()> {
    match cmd {
        ApiCommands::Serve => api::lifecycle::serve(config),
        ApiCommands::Install => api::lifecycle::install(host()?.as_ref(), config),
        ApiCommands::Uninstall => api::lifecycle::uninstall(host()?.as_ref(), config),
        ApiCommands::Start => api::lifecycle::start(host()?.as_ref(), config),
        ApiCommands::Stop => api::lifecycle::stop(host()?.as_ref(), config),
        ApiCommands::Restart => api::lifecycle::restart(host()?.as_ref(), config),
        ApiCommands::Status => api::lifecycle::status(host()?.as_ref(), config).map(|_| ()),
    }
}

/// Production host manager. Constructed per command so a missing manager
/// surfaces as one clear error on the command that needed it.
fn host() -> Result<Box<dyn ServiceHost>> {
    Ok(Box::new(SystemdUserHost::new()?))
}
