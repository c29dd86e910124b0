// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RNDC command execution
//!
//! This module executes rndc commands using the system's rndc binary.
//! The rndc binary must be configured with appropriate keys in /etc/bind/rndc.conf

use std::time::{Duration, Instant};
use tracing::info;

use crate::metrics;
use crate::reload::{run_bounded, ReloadError, ZoneReloader};

/// Default rndc binary
pub const DEFAULT_RNDC_PATH: &str = "/usr/sbin/rndc";

/// RNDC command executor bound to the whitelist zone
#[derive(Debug, Clone)]
pub struct RndcExecutor {
    pub(crate) rndc_path: String,
    pub(crate) zone_name: String,
    pub(crate) timeout: Duration,
}

impl RndcExecutor {
    /// Create a new RNDC executor
    ///
    /// # Arguments
    /// * `rndc_path` - Path to the rndc binary (default: "/usr/sbin/rndc")
    /// * `zone_name` - Zone reloaded by [`ZoneReloader::reload`] (e.g., "aa-wl.rpz.example")
    /// * `timeout` - Upper bound for each rndc invocation
    pub fn new(rndc_path: Option<String>, zone_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            rndc_path: rndc_path.unwrap_or_else(|| DEFAULT_RNDC_PATH.to_string()),
            zone_name: zone_name.into(),
            timeout,
        }
    }

    /// Execute an rndc command
    ///
    /// # Returns
    /// The stdout output from rndc on success
    async fn execute(&self, args: &[&str]) -> Result<String, ReloadError> {
        let start = Instant::now();
        let command_name = args.first().copied().unwrap_or("unknown");
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

        let result = run_bounded(&self.rndc_path, &args, self.timeout).await;
        metrics::record_rndc_command(
            command_name,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// Get server status
    pub async fn status(&self) -> Result<String, ReloadError> {
        self.execute(&["status"]).await
    }

    /// Reload a zone
    pub async fn reload_zone(&self, zone_name: &str) -> Result<String, ReloadError> {
        self.execute(&["reload", zone_name]).await
    }
}

#[async_trait::async_trait]
impl ZoneReloader for RndcExecutor {
    async fn reload(&self) -> Result<String, ReloadError> {
        let start = Instant::now();
        let result = self.reload_zone(&self.zone_name).await;
        metrics::record_reload(self.name(), result.is_ok(), start.elapsed().as_secs_f64());
        if result.is_ok() {
            info!("rndc reloaded zone {}", self.zone_name);
        }
        result
    }

    fn name(&self) -> &str {
        "rndc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rndc_executor_creation() {
        let executor = RndcExecutor::new(None, "wl.rpz", Duration::from_secs(5));
        assert_eq!(executor.rndc_path, "/usr/sbin/rndc");
        assert_eq!(executor.zone_name, "wl.rpz");

        let executor_custom = RndcExecutor::new(
            Some("/custom/path/rndc".to_string()),
            "wl.rpz",
            Duration::from_secs(1),
        );
        assert_eq!(executor_custom.rndc_path, "/custom/path/rndc");
        assert_eq!(executor_custom.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_rndc_executor_clone() {
        let executor = RndcExecutor::new(
            Some("/custom/path/rndc".to_string()),
            "wl.rpz",
            Duration::from_secs(5),
        );
        let cloned = executor.clone();
        assert_eq!(cloned.rndc_path, "/custom/path/rndc");
        assert_eq!(cloned.zone_name, "wl.rpz");
    }

    // Executing real rndc commands needs a running BIND9 instance; the reload
    // failure paths are covered through the generic command runner instead.
}
