// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whitelist zone update pipeline
//!
//! One update runs through these stages, strictly in order:
//!
//! ```text
//! Validating -> BackingUp -> Rewriting -> Committing -> Reloading -> Done
//! ```
//!
//! Any stage can end in `Failed(code)`. Nothing is retried. A failure after
//! `Committing` leaves the new zone on disk without the server having loaded it,
//! unless rollback on reload failure is enabled.
//!
//! Updates to the same zone file are serialized through a per-file lock held from
//! `BackingUp` until the update finishes. Different zone files do not contend.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    backup::{self, BackupError},
    metrics,
    reload::{ReloadError, ZoneReloader},
    serial::AllocatedSerial,
    types::{RELOAD_ERROR_CODE, VALIDATION_ERROR_CODE, ZONE_FILE_ERROR_CODE},
    whitelist::{ValidationError, WhitelistRequest},
    zonefile::{self, ZoneFileError},
};

/// Stages of a zone update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Validating,
    BackingUp,
    Rewriting,
    Committing,
    Reloading,
    Done,
    Failed(u32),
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStage::Validating => f.write_str("validating"),
            UpdateStage::BackingUp => f.write_str("backing-up"),
            UpdateStage::Rewriting => f.write_str("rewriting"),
            UpdateStage::Committing => f.write_str("committing"),
            UpdateStage::Reloading => f.write_str("reloading"),
            UpdateStage::Done => f.write_str("done"),
            UpdateStage::Failed(code) => write!(f, "failed({})", code),
        }
    }
}

/// Update errors
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("{source}")]
    ZoneFile {
        stage: UpdateStage,
        #[source]
        source: ZoneFileError,
    },

    #[error("{source}")]
    Reload {
        rolled_back: bool,
        #[source]
        source: ReloadError,
    },
}

impl UpdateError {
    /// Numeric error code
    pub fn code(&self) -> u32 {
        match self {
            UpdateError::Validation(_) => VALIDATION_ERROR_CODE,
            UpdateError::Backup(_) | UpdateError::ZoneFile { .. } => ZONE_FILE_ERROR_CODE,
            UpdateError::Reload { .. } => RELOAD_ERROR_CODE,
        }
    }

    /// Stage the update was in when it failed
    pub fn stage(&self) -> UpdateStage {
        match self {
            UpdateError::Validation(_) => UpdateStage::Validating,
            UpdateError::Backup(_) => UpdateStage::BackingUp,
            UpdateError::ZoneFile { stage, .. } => *stage,
            UpdateError::Reload { .. } => UpdateStage::Reloading,
        }
    }

    /// Whether the live zone file was changed before the failure
    pub fn zone_changed(&self) -> bool {
        matches!(
            self,
            UpdateError::Reload {
                rolled_back: false,
                ..
            }
        )
    }
}

/// Result of a completed update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub serial: AllocatedSerial,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    pub records: usize,
    pub reload_output: String,
}

lazy_static! {
    static ref ZONE_LOCKS: std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> =
        std::sync::Mutex::new(HashMap::new());
}

/// Canonical lock key for a zone file
///
/// A file that does not exist yet is keyed by its canonical parent directory plus
/// its file name, so different spellings of the same path share one key.
fn lock_key(zone_file: &Path) -> PathBuf {
    if let Ok(path) = std::fs::canonicalize(zone_file) {
        return path;
    }

    match (zone_file.parent(), zone_file.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            std::fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| zone_file.to_path_buf())
        }
        _ => zone_file.to_path_buf(),
    }
}

/// Process-wide writer lock for a zone file
pub(crate) fn zone_lock(zone_file: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(zone_file);
    let mut locks = ZONE_LOCKS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks
        .entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

fn advance(stage: &mut UpdateStage, next: UpdateStage) {
    debug!("Zone update {} -> {}", stage, next);
    *stage = next;
}

/// Runs whitelist updates against one zone file
pub struct ZoneUpdateCoordinator {
    zone_file: PathBuf,
    reloader: Arc<dyn ZoneReloader>,
    rollback_on_reload_failure: bool,
    lock: Arc<Mutex<()>>,
}

impl ZoneUpdateCoordinator {
    /// Create a coordinator for `zone_file`
    ///
    /// Coordinators created for the same file share one writer lock.
    pub fn new(
        zone_file: impl Into<PathBuf>,
        reloader: Arc<dyn ZoneReloader>,
        rollback_on_reload_failure: bool,
    ) -> Self {
        let zone_file = zone_file.into();
        let lock = zone_lock(&zone_file);
        Self {
            zone_file,
            reloader,
            rollback_on_reload_failure,
            lock,
        }
    }

    pub fn zone_file(&self) -> &Path {
        &self.zone_file
    }

    pub fn reloader(&self) -> &dyn ZoneReloader {
        self.reloader.as_ref()
    }

    /// Validate a raw payload into a request
    pub fn validate(payload: serde_json::Value) -> Result<WhitelistRequest, UpdateError> {
        WhitelistRequest::from_json(payload).map_err(|e| {
            error!("Whitelist request rejected ({}): {}", VALIDATION_ERROR_CODE, e);
            metrics::record_whitelist_update("invalid", Some(VALIDATION_ERROR_CODE));
            UpdateError::from(e)
        })
    }

    /// Apply a validated request to the zone and reload the server
    pub async fn apply(&self, request: &WhitelistRequest) -> Result<UpdateOutcome, UpdateError> {
        let action = request.action();
        info!(
            "Whitelist {} of {} domain(s) on {}",
            action,
            request.domains().len(),
            self.zone_file.display()
        );

        if request.is_empty() {
            debug!("Empty whitelist request, only the serial changes");
        }

        let result = self.run(request).await;

        match &result {
            Ok(outcome) => {
                info!(
                    "Whitelist zone {} now at serial {} (added: {:?}, removed: {:?}, unchanged: {:?})",
                    self.zone_file.display(),
                    outcome.serial.current,
                    outcome.added,
                    outcome.removed,
                    outcome.unchanged
                );
                metrics::record_whitelist_update(action.label(), None);
            }
            Err(e) => {
                error!(
                    "Whitelist {} {} while {}: {} (domains: {:?}, zone changed: {})",
                    action,
                    UpdateStage::Failed(e.code()),
                    e.stage(),
                    e,
                    request.domains(),
                    e.zone_changed()
                );
                if let Some(cause) = std::error::Error::source(e) {
                    error!("Caused by: {}", cause);
                }
                metrics::record_whitelist_update(action.label(), Some(e.code()));
            }
        }

        result
    }

    async fn run(&self, request: &WhitelistRequest) -> Result<UpdateOutcome, UpdateError> {
        let mut stage = UpdateStage::Validating;
        let _guard = self.lock.lock().await;

        advance(&mut stage, UpdateStage::BackingUp);
        let backup = backup::snapshot(&self.zone_file).await?;

        advance(&mut stage, UpdateStage::Rewriting);
        let content = zonefile::read(&self.zone_file)
            .await
            .map_err(|source| UpdateError::ZoneFile { stage, source })?;
        let rewrite = zonefile::rewrite(&content, request)
            .map_err(|source| UpdateError::ZoneFile { stage, source })?;

        advance(&mut stage, UpdateStage::Committing);
        zonefile::write(&self.zone_file, &rewrite)
            .await
            .map_err(|source| UpdateError::ZoneFile { stage, source })?;
        metrics::update_zone_state(rewrite.serial.current.value(), rewrite.records);

        advance(&mut stage, UpdateStage::Reloading);
        let reload_output = match self.reloader.reload().await {
            Ok(output) => output,
            Err(source) => {
                let rolled_back = self.roll_back(&backup, &rewrite.serial).await;
                return Err(UpdateError::Reload {
                    rolled_back,
                    source,
                });
            }
        };

        advance(&mut stage, UpdateStage::Done);
        Ok(UpdateOutcome {
            serial: rewrite.serial,
            added: rewrite.added,
            removed: rewrite.removed,
            unchanged: rewrite.unchanged,
            records: rewrite.records,
            reload_output,
        })
    }

    /// Restore the pre-update zone after a failed reload, when enabled
    async fn roll_back(&self, backup: &backup::Backup, serial: &AllocatedSerial) -> bool {
        if !self.rollback_on_reload_failure {
            warn!(
                "Reload via {} failed; zone {} stays committed at serial {}",
                self.reloader.name(),
                self.zone_file.display(),
                serial.current
            );
            return false;
        }

        match backup::restore(backup, &self.zone_file).await {
            Ok(()) => {
                warn!(
                    "Reload via {} failed; zone {} rolled back to serial {}",
                    self.reloader.name(),
                    self.zone_file.display(),
                    serial.previous
                );
                metrics::ZONE_SERIAL.set(f64::from(serial.previous.value()));
                true
            }
            Err(e) => {
                error!("Rollback of {} failed: {}", self.zone_file.display(), e);
                false
            }
        }
    }
}
