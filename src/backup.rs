//! Dump and restore of the application database through the bundled
//! client binaries.
//!
//! `backup` streams the dump client's stdout into a timestamped file under
//! `{base}/backups`; `restore` feeds a dump file into the restore client's
//! stdin. Both talk to the running engine over its configured address, so
//! the database service must be up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::config::DatabaseConfig;
use crate::layout::InstallationLayout;
use crate::process::{Cmd, CmdError};

/// `backup_YYYYMMDD_HHMMSS.sql`
const TIMESTAMP: &[FormatItem<'_>] =
    format_description!("[year][month][day]_[hour][minute][second]");

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("dump client {path} not found; run 'appstack database init' first")]
    ClientMissing { path: PathBuf },

    #[error("creating backup directory {path}: {source}")]
    BackupDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dumping database: {source}")]
    Dump {
        #[source]
        source: CmdError,
    },
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("backup file {path} not found")]
    FileNotFound { path: PathBuf },

    #[error("restore client {path} not found; run 'appstack database init' first")]
    ClientMissing { path: PathBuf },

    #[error("restoring database: {source}")]
    Restore {
        #[source]
        source: CmdError,
    },
}

/// Dump the application database into a fresh timestamped file and return
/// its path. A failed dump leaves whatever partial file was written; the
/// error names the failure, not the file.
pub fn backup(layout: &InstallationLayout, db: &DatabaseConfig) -> Result<PathBuf, BackupError> {
    println!("Backing up database '{}'...", db.name);

    let client = layout.dump_client();
    if !client.exists() {
        return Err(BackupError::ClientMissing { path: client });
    }

    let dir = layout.backups_dir();
    fs::create_dir_all(&dir).map_err(|source| BackupError::BackupDir {
        path: dir.clone(),
        source,
    })?;

    let file = dir.join(format!("backup_{}.sql", timestamp()));
    Cmd::new(client)
        .args(connection_flags(db))
        .arg(&db.name)
        .stdout_file(&file)
        .error_msg("database dump failed")
        .run()
        .map_err(|source| BackupError::Dump { source })?;

    println!("Backup written to {}", file.display());
    Ok(file)
}

/// Replay a dump file into the application database.
pub fn restore(
    layout: &InstallationLayout,
    db: &DatabaseConfig,
    file: &Path,
) -> Result<(), RestoreError> {
    println!("Restoring database '{}' from {}...", db.name, file.display());

    if !file.exists() {
        return Err(RestoreError::FileNotFound {
            path: file.to_path_buf(),
        });
    }
    let client = layout.sql_client();
    if !client.exists() {
        return Err(RestoreError::ClientMissing { path: client });
    }

    Cmd::new(client)
        .args(connection_flags(db))
        .arg(&db.name)
        .stdin_file(file)
        .error_msg("database restore failed")
        .run()
        .map_err(|source| RestoreError::Restore { source })?;

    println!("Database restored");
    Ok(())
}

fn connection_flags(db: &DatabaseConfig) -> Vec<String> {
    vec![
        "-h".into(),
        db.host.clone(),
        "-P".into(),
        db.port.to_string(),
        "-u".into(),
        db.user.clone(),
        format!("-p{}", db.password),
    ]
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    // The format has no fallible components.
    now.format(&TIMESTAMP)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
