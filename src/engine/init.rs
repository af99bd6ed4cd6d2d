//! First-run initialization of the embedded engine.
//!
//! Four stages: unpack the distribution, generate admin credentials, let the
//! engine create its data directory, then boot the engine once against a
//! bootstrap script that sets the root password, creates the application
//! database and accounts, and shuts the engine down again. The data
//! directory is the only completion marker: when it exists the whole
//! sequence short-circuits, and recovering from a broken install means
//! deleting it and re-running.

use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::bundle::{self, ExtractError};
use crate::config::DatabaseConfig;
use crate::layout::InstallationLayout;
use crate::process::{Cmd, CmdError};

use super::LIBRARY_PATH_VAR;

/// Length of the generated root password.
const ADMIN_SECRET_LEN: usize = 24;

const BOOTSTRAP_SCRIPT: &str = "bootstrap.sql";

#[derive(Debug, Error)]
pub enum InitError {
    #[error("extracting engine distribution: {source}")]
    Extract {
        #[from]
        source: ExtractError,
    },

    #[error("storing admin secret {path}: {source}")]
    Secret {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing bootstrap script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("creating data directory: {source}")]
    DataDir {
        #[source]
        source: CmdError,
    },

    #[error("bootstrapping accounts: {source}")]
    Bootstrap {
        #[source]
        source: CmdError,
    },
}

/// Run the full initialization sequence. Idempotent: an existing data
/// directory means an earlier run completed and the sequence returns
/// immediately without touching anything.
pub fn initialize(layout: &InstallationLayout, db: &DatabaseConfig) -> Result<(), InitError> {
    println!("Initializing database engine...");

    if layout.is_initialized() {
        println!(
            "  [SKIP] Data directory {} exists, engine already initialized",
            layout.data_dir().display()
        );
        return Ok(());
    }

    println!("  Unpacking engine distribution...");
    bundle::extract_engine(&layout.engine_dir())?;

    println!("  Generating admin credentials...");
    let secret = store_admin_secret(&layout.admin_secret())?;

    println!("  Creating data directory...");
    create_data_dir(layout)?;

    println!("  Creating application database and accounts...");
    bootstrap_accounts(layout, db, &secret)?;

    println!("Database engine initialized at {}", layout.base().display());
    Ok(())
}

/// Generate the root password and persist it owner-readable next to the
/// engine. Overwrites any leftover from an earlier aborted run.
fn store_admin_secret(path: &Path) -> Result<String, InitError> {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ADMIN_SECRET_LEN)
        .map(char::from)
        .collect();

    fs::write(path, &secret).map_err(|source| InitError::Secret {
        path: path.to_path_buf(),
        source,
    })?;
    fs::set_permissions(path, Permissions::from_mode(0o600)).map_err(|source| {
        InitError::Secret {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(secret)
}

fn create_data_dir(layout: &InstallationLayout) -> Result<(), InitError> {
    Cmd::new(layout.engine_binary())
        .arg("--initialize-insecure")
        .arg(format!("--datadir={}", layout.data_dir().display()))
        .env(LIBRARY_PATH_VAR, layout.engine_lib_dir())
        .error_msg("engine data directory initialization failed")
        .run()
        .map_err(|source| InitError::DataDir { source })?;
    Ok(())
}

/// Boot the engine once against the generated bootstrap script. The script
/// carries every credential in clear text, so it is removed when this
/// returns no matter how the run went.
fn bootstrap_accounts(
    layout: &InstallationLayout,
    db: &DatabaseConfig,
    secret: &str,
) -> Result<(), InitError> {
    let script_path = layout.engine_dir().join(BOOTSTRAP_SCRIPT);
    fs::write(&script_path, bootstrap_sql(db, secret)).map_err(|source| InitError::Script {
        path: script_path.clone(),
        source,
    })?;
    let _cleanup = RemoveOnDrop(&script_path);
    fs::set_permissions(&script_path, Permissions::from_mode(0o600)).map_err(|source| {
        InitError::Script {
            path: script_path.clone(),
            source,
        }
    })?;

    Cmd::new(layout.engine_binary())
        .arg(format!("--init-file={}", script_path.display()))
        .arg(format!("--datadir={}", layout.data_dir().display()))
        .env(LIBRARY_PATH_VAR, layout.engine_lib_dir())
        .error_msg("engine account bootstrap failed")
        .run()
        .map_err(|source| InitError::Bootstrap { source })?;

    Ok(())
}

/// The final `SHUTDOWN` makes the bootstrap boot exit on its own once the
/// script has run.
fn bootstrap_sql(db: &DatabaseConfig, secret: &str) -> String {
    format!(
        "ALTER USER 'root'@'localhost' IDENTIFIED BY '{secret}';\n\
         FLUSH PRIVILEGES;\n\
         \n\
         CREATE DATABASE IF NOT EXISTS `{name}` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;\n\
         \n\
         CREATE USER IF NOT EXISTS '{user}'@'localhost' IDENTIFIED BY '{password}';\n\
         CREATE USER IF NOT EXISTS '{user}'@'%' IDENTIFIED BY '{password}';\n\
         GRANT ALL PRIVILEGES ON `{name}`.* TO '{user}'@'localhost';\n\
         GRANT ALL PRIVILEGES ON `{name}`.* TO '{user}'@'%';\n\
         FLUSH PRIVILEGES;\n\
         \n\
         SHUTDOWN;\n",
        name = db.name,
        user = db.user,
        password = db.password,
        secret = secret,
    )
}

struct RemoveOnDrop<'a>(&'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn initialize_short_circuits_when_data_dir_exists() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(tmp.path());
        fs::create_dir_all(layout.data_dir()).unwrap();

        initialize(&layout, &DatabaseConfig::default()).unwrap();

        // Nothing was extracted or generated.
        assert!(!layout.engine_binary().exists());
        assert!(!layout.admin_secret().exists());
    }

    #[test]
    fn initialize_builds_a_complete_layout() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(tmp.path());

        initialize(&layout, &DatabaseConfig::default()).unwrap();

        assert!(layout.is_initialized());
        assert!(layout.engine_binary().exists());
        assert!(layout.engine_lib_dir().is_dir());

        let secret = fs::read_to_string(layout.admin_secret()).unwrap();
        assert_eq!(secret.len(), ADMIN_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        let mode = fs::metadata(layout.admin_secret()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // The bootstrap script must not survive the run.
        assert!(!layout.engine_dir().join(BOOTSTRAP_SCRIPT).exists());
    }

    #[test]
    fn second_initialize_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(tmp.path());

        initialize(&layout, &DatabaseConfig::default()).unwrap();
        let secret_before = fs::read_to_string(layout.admin_secret()).unwrap();

        initialize(&layout, &DatabaseConfig::default()).unwrap();
        let secret_after = fs::read_to_string(layout.admin_secret()).unwrap();

        assert_eq!(secret_before, secret_after);
    }

    #[test]
    fn bootstrap_sql_sets_up_accounts_and_shuts_down() {
        let db = DatabaseConfig {
            name: "appdb".into(),
            user: "appuser".into(),
            password: "apppass".into(),
            ..DatabaseConfig::default()
        };

        let sql = bootstrap_sql(&db, "s3cret");

        assert!(sql.starts_with("ALTER USER 'root'@'localhost' IDENTIFIED BY 's3cret';\n"));
        assert!(sql.contains(
            "CREATE DATABASE IF NOT EXISTS `appdb` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;"
        ));
        assert!(sql.contains("CREATE USER IF NOT EXISTS 'appuser'@'localhost' IDENTIFIED BY 'apppass';"));
        assert!(sql.contains("GRANT ALL PRIVILEGES ON `appdb`.* TO 'appuser'@'%';"));
        assert!(sql.ends_with("SHUTDOWN;\n"));
    }

    #[test]
    fn failed_bootstrap_still_removes_the_script() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(tmp.path());
        fs::create_dir_all(layout.engine_bin_dir()).unwrap();
        fs::create_dir_all(layout.engine_lib_dir()).unwrap();
        fs::write(layout.engine_binary(), "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(layout.engine_binary(), Permissions::from_mode(0o755)).unwrap();

        let err = bootstrap_accounts(&layout, &DatabaseConfig::default(), "x").unwrap_err();
        assert!(matches!(err, InitError::Bootstrap { .. }));
        assert!(!layout.engine_dir().join(BOOTSTRAP_SCRIPT).exists());
    }
}
