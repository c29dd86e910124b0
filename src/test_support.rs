// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::coordinator::ZoneUpdateCoordinator;
use crate::reload::{ReloadError, ZoneReloader};

/// Whitelist zone at serial 42 with one record
pub const ZONE: &str = "\
$TTL 3600
@\tIN\tSOA\tns.example. hostmaster.example. (
\t\t\t0000000042\t;Serial
\t\t\t3600\t\t;Refresh
\t\t\t600\t\t;Retry
\t\t\t604800\t\t;Expire
\t\t\t86400 )\t\t;Negative TTL
\tIN\tNS\tns.example.
a.example.\t\tCNAME\trpz-passthru.
";

pub const RECORD_A: &str = "a.example.\t\tCNAME\trpz-passthru.\n";
pub const RECORD_B: &str = "b.example.\t\tCNAME\trpz-passthru.\n";

/// Reloader that succeeds or fails on demand and counts calls
pub struct FakeReloader {
    fail: bool,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeReloader {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ZoneReloader for FakeReloader {
    async fn reload(&self) -> Result<String, ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            Err(ReloadError::InvalidCommand("fake reload failure".to_string()))
        } else {
            Ok("server reload successful".to_string())
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Temporary directory holding a zone file with `content`
pub fn zone_dir(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wl.rpz.zone");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

/// Coordinator over `path` using `reloader`
pub fn coordinator(
    path: &std::path::Path,
    reloader: Arc<FakeReloader>,
    rollback: bool,
) -> ZoneUpdateCoordinator {
    ZoneUpdateCoordinator::new(path, reloader, rollback)
}
