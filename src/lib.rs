//! Lifecycle layer for a self-contained application bundle.
//!
//! The `appstack` binary ships its own database engine distribution, schema
//! migration tool, and API service shell as embedded resources, and manages
//! the engine and the API as OS services on a machine that has none of them
//! preinstalled. This crate is the orchestration underneath:
//!
//! - **Resource bundle** - Embedded engine archive and migration tool,
//!   extracted through a disposable staging directory ([`bundle`])
//! - **Initialization** - One-time, idempotent engine setup: unpack, create
//!   the data directory, bootstrap accounts ([`engine::init`])
//! - **Service control** - Uniform install/start/stop/restart/status verbs
//!   over a host service manager ([`service`])
//! - **Supervision** - What runs inside each managed service: the engine
//!   child process or the in-process API server ([`engine::supervisor`],
//!   [`api::server`])
//! - **Tooling** - Schema migrations ([`migrate`]) and dump/restore
//!   ([`backup`]) through supervised subprocesses
//! - **Watchdog** - Background database connectivity checks that take the
//!   API service down after repeated failures ([`watchdog`])
//!
//! The HTTP application itself and its data-access layer are collaborators:
//! they plug in through [`api::ApiBackend`] and [`watchdog::ConnectivityProbe`].

pub mod api;
pub mod backup;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod layout;
pub mod migrate;
pub mod process;
pub mod service;
pub mod watchdog;
pub mod worker;
