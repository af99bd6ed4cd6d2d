//! Filesystem layout owned by the orchestrator.
//!
//! Everything lives under one base directory (normally the executable's own):
//!
//! ```text
//! {base}/engine/bin/        engine distribution binaries
//! {base}/engine/lib/        engine shared libraries
//! {base}/engine/data/       engine data directory (presence = initialized)
//! {base}/engine/engine.cnf  generated runtime config
//! {base}/engine/.admin-secret
//! {base}/logs/              engine error log
//! {base}/backups/           timestamped dump files
//! ```
//!
//! The data directory is the sole idempotency marker: initialization
//! short-circuits when it exists and nothing else is consulted.

use std::path::{Path, PathBuf};

/// File names inside the extracted engine distribution.
pub const ENGINE_BINARY: &str = "mysqld";
pub const ADMIN_CLIENT: &str = "mysqladmin";
pub const DUMP_CLIENT: &str = "mysqldump";
pub const SQL_CLIENT: &str = "mysql";

const ENGINE_CONFIG_FILE: &str = "engine.cnf";
const ADMIN_SECRET_FILE: &str = ".admin-secret";
const PID_FILE: &str = "engine.pid";
const ERROR_LOG_FILE: &str = "engine-error.log";

#[derive(Debug, Clone)]
pub struct InstallationLayout {
    base: PathBuf,
}

impl InstallationLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn engine_dir(&self) -> PathBuf {
        self.base.join("engine")
    }

    pub fn engine_bin_dir(&self) -> PathBuf {
        self.engine_dir().join("bin")
    }

    pub fn engine_lib_dir(&self) -> PathBuf {
        self.engine_dir().join("lib")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.engine_dir().join("data")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.base.join("backups")
    }

    pub fn engine_config(&self) -> PathBuf {
        self.engine_dir().join(ENGINE_CONFIG_FILE)
    }

    pub fn admin_secret(&self) -> PathBuf {
        self.engine_dir().join(ADMIN_SECRET_FILE)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.engine_dir().join(PID_FILE)
    }

    pub fn error_log(&self) -> PathBuf {
        self.logs_dir().join(ERROR_LOG_FILE)
    }

    pub fn engine_binary(&self) -> PathBuf {
        self.engine_bin_dir().join(ENGINE_BINARY)
    }

    pub fn admin_client(&self) -> PathBuf {
        self.engine_bin_dir().join(ADMIN_CLIENT)
    }

    pub fn dump_client(&self) -> PathBuf {
        self.engine_bin_dir().join(DUMP_CLIENT)
    }

    pub fn sql_client(&self) -> PathBuf {
        self.engine_bin_dir().join(SQL_CLIENT)
    }

    /// Whether one-time initialization already ran. The data directory is
    /// the only marker consulted.
    pub fn is_initialized(&self) -> bool {
        self.data_dir().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn paths_hang_off_base() {
        let layout = InstallationLayout::new("/opt/appstack");
        assert_eq!(layout.engine_dir(), Path::new("/opt/appstack/engine"));
        assert_eq!(layout.data_dir(), Path::new("/opt/appstack/engine/data"));
        assert_eq!(
            layout.engine_binary(),
            Path::new("/opt/appstack/engine/bin/mysqld")
        );
        assert_eq!(
            layout.engine_config(),
            Path::new("/opt/appstack/engine/engine.cnf")
        );
        assert_eq!(
            layout.error_log(),
            Path::new("/opt/appstack/logs/engine-error.log")
        );
        assert_eq!(layout.backups_dir(), Path::new("/opt/appstack/backups"));
    }

    #[test]
    fn initialized_iff_data_dir_exists() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallationLayout::new(tmp.path());
        assert!(!layout.is_initialized());

        fs::create_dir_all(layout.data_dir()).unwrap();
        assert!(layout.is_initialized());
    }
}
