//! Schema migration runner.
//!
//! Materializes the embedded migration tool and migration files into a
//! scratch directory, points the tool at the configured database, and
//! removes the scratch directory however the run ends. An already
//! up-to-date schema is a plain success.

use std::env;
use std::path::Path;

use thiserror::Error;

use crate::bundle::{self, ExtractError, ScratchGuard};
use crate::config::DatabaseConfig;
use crate::process::{Cmd, CmdError};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("preparing migration workspace: {source}")]
    Workspace {
        #[from]
        source: ExtractError,
    },

    #[error("applying migrations: {source}")]
    Apply {
        #[source]
        source: CmdError,
    },
}

/// Apply every embedded migration to the configured database.
pub fn migrate(db: &DatabaseConfig) -> Result<(), MigrateError> {
    println!("Applying database migrations...");

    let scratch = env::temp_dir().join(bundle::tmp_name("appstack-migrate"));
    let _guard = ScratchGuard::new(&scratch);

    let tool = bundle::extract_tool(&scratch)?;
    let migrations = scratch.join("migrations");
    bundle::write_migrations(&migrations)?;

    let output = apply(&tool, &migrations, &db.connection_url())?;
    if !output.is_empty() {
        println!("{output}");
    }
    println!("Migrations applied");
    Ok(())
}

fn apply(tool: &Path, migrations: &Path, url: &str) -> Result<String, MigrateError> {
    let result = Cmd::new(tool)
        .args(["migrate", "apply"])
        .arg("--dir")
        .arg(format!("file://{}", migrations.display()))
        .args(["--url", url])
        .error_msg("migration tool failed")
        .run()
        .map_err(|source| MigrateError::Apply { source })?;

    Ok(result.combined())
}
