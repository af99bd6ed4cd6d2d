//! Engine configuration file generation.
//!
//! `engine.cnf` is regenerated on every install from the live layout and
//! configuration, so a moved base directory or changed port takes effect
//! without hand-editing. The file on disk is owned by this module.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::layout::InstallationLayout;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("creating {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write `engine.cnf` and make sure the log directory it references exists.
pub fn generate(layout: &InstallationLayout, db: &DatabaseConfig) -> Result<(), ConfigError> {
    fs::create_dir_all(layout.logs_dir()).map_err(|source| ConfigError::CreateDir {
        path: layout.logs_dir(),
        source,
    })?;

    fs::write(layout.engine_config(), render(layout, db)).map_err(|source| ConfigError::Write {
        path: layout.engine_config(),
        source,
    })?;
    Ok(())
}

fn render(layout: &InstallationLayout, db: &DatabaseConfig) -> String {
    format!(
        "[mysqld]\n\
         port={port}\n\
         basedir={basedir}\n\
         datadir={datadir}\n\
         pid-file={pid_file}\n\
         log-error={log_error}\n\
         character-set-server=utf8mb4\n\
         default-storage-engine=INNODB\n",
        port = db.port,
        basedir = layout.engine_dir().display(),
        datadir = layout.data_dir().display(),
        pid_file = layout.pid_file().display(),
        log_error = layout.error_log().display(),
    )
}
