// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone file snapshots
//!
//! Before a zone file is touched it is copied to a sibling `<file>.bak`. Only the
//! most recent snapshot is kept.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::zonefile;

/// Suffix appended to the zone file name to form the backup path
pub const BACKUP_SUFFIX: &str = ".bak";

/// Backup errors
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Cannot backup whitelist zone {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot restore whitelist zone from {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A snapshot of a zone file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Where the snapshot lives
    pub path: PathBuf,
    /// Size of the snapshot in bytes
    pub bytes: u64,
}

/// Backup path for a zone file (`/zones/rpz.zone` -> `/zones/rpz.zone.bak`)
pub fn backup_path(zone_file: &Path) -> PathBuf {
    let mut name: OsString = zone_file.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy the zone file to its backup path, replacing any previous backup
pub async fn snapshot(zone_file: &Path) -> Result<Backup, BackupError> {
    let path = backup_path(zone_file);
    debug!(
        "Backing up {} to {}",
        zone_file.display(),
        path.display()
    );

    let bytes = tokio::fs::copy(zone_file, &path).await.map_err(|e| {
        error!("Failed to backup {}: {}", zone_file.display(), e);
        BackupError::Snapshot {
            path: zone_file.to_path_buf(),
            source: e,
        }
    })?;

    info!("Backed up zone file to {} ({} bytes)", path.display(), bytes);
    Ok(Backup { path, bytes })
}

/// Put a snapshot back over the live zone file
///
/// Goes through the same temp-file-and-rename commit as a normal rewrite, so a
/// reader sees either the rejected content or the restored one.
pub async fn restore(backup: &Backup, zone_file: &Path) -> Result<(), BackupError> {
    let restore_err = |source| BackupError::Restore {
        path: backup.path.clone(),
        source,
    };

    let content = tokio::fs::read(&backup.path).await.map_err(restore_err)?;
    zonefile::commit(zone_file, &content)
        .await
        .map_err(restore_err)?;

    info!(
        "Restored {} from {}",
        zone_file.display(),
        backup.path.display()
    );
    Ok(())
}
