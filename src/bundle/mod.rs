//! Embedded resource bundle: the engine distribution archive and the
//! single-file migration tool, plus their extraction.
//!
//! Blobs are selected per target platform at compile time and verified
//! against their packaged checksums before anything touches the filesystem.
//! Extraction always goes through a disposable staging directory that is
//! removed when the operation ends, whether it succeeded or not.

use std::fs::{self, Permissions};
use std::io::{self, Cursor};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
mod blobs {
    pub const ENGINE_ARCHIVE: &[u8] =
        include_bytes!("../../resources/engine-x86_64-linux.tar.zst");
    pub const ENGINE_ARCHIVE_SHA256: &str =
        include_str!("../../resources/engine-x86_64-linux.tar.zst.sha256");
    pub const MIGRATE_TOOL: &[u8] = include_bytes!("../../resources/migrate-x86_64-linux");
    pub const MIGRATE_TOOL_SHA256: &str =
        include_str!("../../resources/migrate-x86_64-linux.sha256");
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
compile_error!("no embedded resource bundle for this target; see resources/README.md");

/// Name the migration tool is written under in its scratch directory.
const MIGRATE_TOOL_NAME: &str = "migrate";

/// Versioned schema migrations. Applied in filename order, so the table
/// must stay lexically sorted.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250810120000_create_users.sql",
        include_str!("../../resources/migrations/20250810120000_create_users.sql"),
    ),
    (
        "20250810120100_create_blogs.sql",
        include_str!("../../resources/migrations/20250810120100_create_blogs.sql"),
    ),
    (
        "20250810120200_create_comments.sql",
        include_str!("../../resources/migrations/20250810120200_create_comments.sql"),
    ),
];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("embedded {resource} is corrupt: sha256 {actual}, expected {expected}")]
    Checksum {
        resource: &'static str,
        expected: String,
        actual: String,
    },

    #[error("unpacking embedded engine archive: {source}")]
    Unpack {
        #[source]
        source: io::Error,
    },

    #[error("preparing staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("placing {path}: {source}")]
    Place {
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

/// Unpack the embedded engine distribution into `target_dir`.
///
/// Handles both archive layouts seen in real distributions: a single
/// versioned top-level folder (renamed to become `target_dir`) and a flat
/// layout (every top-level entry moved into a fresh `target_dir`).
pub fn extract_engine(target_dir: &Path) -> Result<(), ExtractError> {
    verify_blob(
        "engine archive",
        blobs::ENGINE_ARCHIVE,
        blobs::ENGINE_ARCHIVE_SHA256,
    )?;
    unpack_archive(blobs::ENGINE_ARCHIVE, target_dir)
}

/// Write the embedded migration tool into `scratch_dir` with executable
/// permission and return its path.
pub fn extract_tool(scratch_dir: &Path) -> Result<PathBuf, ExtractError> {
    verify_blob(
        "migration tool",
        blobs::MIGRATE_TOOL,
        blobs::MIGRATE_TOOL_SHA256,
    )?;

    fs::create_dir_all(scratch_dir).map_err(|source| ExtractError::Staging {
        path: scratch_dir.to_path_buf(),
        source,
    })?;

    let tool_path = scratch_dir.join(MIGRATE_TOOL_NAME);
    fs::write(&tool_path, blobs::MIGRATE_TOOL).map_err(|source| ExtractError::Write {
        path: tool_path.clone(),
        source,
    })?;
    fs::set_permissions(&tool_path, Permissions::from_mode(0o755)).map_err(|source| {
        ExtractError::Write {
            path: tool_path.clone(),
            source,
        }
    })?;

    Ok(tool_path)
}

/// Materialize the embedded migration files into `dir`.
pub fn write_migrations(dir: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(dir).map_err(|source| ExtractError::Staging {
        path: dir.to_path_buf(),
        source,
    })?;

    for (name, sql) in MIGRATIONS {
        let path = dir.join(name);
        fs::write(&path, sql).map_err(|source| ExtractError::Write { path, source })?;
    }
    Ok(())
}

/// Removes the wrapped directory tree on drop. Used for staging and scratch
/// directories that must never outlive the operation that created them.
pub(crate) struct ScratchGuard {
    path: PathBuf,
}

impl ScratchGuard {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub(crate) fn tmp_name(prefix: &str) -> String {
    let n = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{prefix}-{n}")
}

fn unpack_archive(blob: &[u8], target_dir: &Path) -> Result<(), ExtractError> {
    let parent = target_dir.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| ExtractError::Staging {
        path: parent.to_path_buf(),
        source,
    })?;

    let staging = parent.join(tmp_name("engine-staging"));
    fs::create_dir_all(&staging).map_err(|source| ExtractError::Staging {
        path: staging.clone(),
        source,
    })?;
    let _guard = ScratchGuard::new(&staging);

    let decoder =
        zstd::stream::Decoder::new(Cursor::new(blob)).map_err(|source| ExtractError::Unpack {
            source,
        })?;
    tar::Archive::new(decoder)
        .unpack(&staging)
        .map_err(|source| ExtractError::Unpack { source })?;

    let mut entries = Vec::new();
    let iter = fs::read_dir(&staging).map_err(|source| ExtractError::Staging {
        path: staging.clone(),
        source,
    })?;
    for entry in iter {
        let entry = entry.map_err(|source| ExtractError::Staging {
            path: staging.clone(),
            source,
        })?;
        entries.push(entry);
    }

    if entries.len() == 1 && entries[0].path().is_dir() {
        // Versioned top-level folder: it becomes the target itself. Moving
        // its contents instead would nest the install one level too deep.
        move_entry(&entries[0].path(), target_dir)?;
    } else {
        fs::create_dir_all(target_dir).map_err(|source| ExtractError::Place {
            path: target_dir.to_path_buf(),
            source,
        })?;
        for entry in &entries {
            move_entry(&entry.path(), &target_dir.join(entry.file_name()))?;
        }
    }

    Ok(())
}

/// Rename with a copy+remove fallback for cross-device moves.
fn move_entry(src: &Path, dst: &Path) -> Result<(), ExtractError> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let copied = if src.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        fs::copy(src, dst).map(|_| ())
    };
    copied.map_err(|source| ExtractError::Place {
        path: dst.to_path_buf(),
        source,
    })?;

    let removed = if src.is_dir() {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    };
    removed.map_err(|source| ExtractError::Staging {
        path: src.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if src_path.is_symlink() {
            let target = fs::read_link(&src_path)?;
            std::os::unix::fs::symlink(target, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

fn verify_blob(
    resource: &'static str,
    blob: &[u8],
    checksum_file: &str,
) -> Result<(), ExtractError> {
    // Checksum files are in `sha256sum` output form: "<hex>  <name>".
    let expected = checksum_file.split_whitespace().next().unwrap_or("");

    let mut hasher = Sha256::new();
    hasher.update(blob);
    let actual = format!("{:x}", hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ExtractError::Checksum {
            resource,
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
