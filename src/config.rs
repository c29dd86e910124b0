// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server configuration
//!
//! All settings come from environment variables:
//! - `ZONE_DIR`: Directory holding the whitelist zone (default: /var/lib/bind/zones/master)
//! - `WL_ZONE_FILE`: Whitelist zone file name (default: aa-wl.rpz.ituss.cz.zone)
//! - `API_ADDR`: Listen address (default: 127.0.0.1:8080)
//! - `RELOAD_METHOD`: `command` or `rndc` (default: command)
//! - `RELOAD_COMMAND`: Reload command line for the `command` method
//! - `RNDC_PATH`: rndc binary for the `rndc` method (default: /usr/sbin/rndc)
//! - `WL_ZONE_NAME`: Zone name passed to `rndc reload` (default: file name without `.zone`)
//! - `RELOAD_TIMEOUT_SECS`: Upper bound for one reload (default: 5)
//! - `ROLLBACK_ON_RELOAD_FAILURE`: Restore the backup when reload fails (default: false)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::reload::{
    CommandReloader, ReloadError, ZoneReloader, DEFAULT_RELOAD_COMMAND, DEFAULT_RELOAD_TIMEOUT,
};
use crate::rndc::{RndcExecutor, DEFAULT_RNDC_PATH};

pub const DEFAULT_ZONE_DIR: &str = "/var/lib/bind/zones/master";
pub const DEFAULT_WL_ZONE_FILE: &str = "aa-wl.rpz.ituss.cz.zone";
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:8080";

/// How the DNS server is asked to reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMethod {
    /// Run `RELOAD_COMMAND`
    Command,
    /// Run `rndc reload <zone>`
    Rndc,
}

impl std::str::FromStr for ReloadMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(ReloadMethod::Command),
            "rndc" => Ok(ReloadMethod::Rndc),
            other => Err(format!(
                "Invalid reload method: {}. Must be 'command' or 'rndc'",
                other
            )),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub zone_dir: PathBuf,
    pub zone_file_name: String,
    pub api_addr: String,
    pub reload_method: ReloadMethod,
    pub reload_command: String,
    pub rndc_path: String,
    pub zone_name: String,
    pub reload_timeout: Duration,
    pub rollback_on_reload_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_dir: PathBuf::from(DEFAULT_ZONE_DIR),
            zone_file_name: DEFAULT_WL_ZONE_FILE.to_string(),
            api_addr: DEFAULT_API_ADDR.to_string(),
            reload_method: ReloadMethod::Command,
            reload_command: DEFAULT_RELOAD_COMMAND.to_string(),
            rndc_path: DEFAULT_RNDC_PATH.to_string(),
            zone_name: zone_name_from_file(DEFAULT_WL_ZONE_FILE),
            reload_timeout: DEFAULT_RELOAD_TIMEOUT,
            rollback_on_reload_failure: false,
        }
    }
}

/// Zone name for a zone file name (`wl.rpz.zone` -> `wl.rpz`)
fn zone_name_from_file(file_name: &str) -> String {
    file_name
        .strip_suffix(".zone")
        .unwrap_or(file_name)
        .to_string()
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let zone_dir = std::env::var("ZONE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.zone_dir);
        let zone_file_name = std::env::var("WL_ZONE_FILE").unwrap_or(defaults.zone_file_name);
        let api_addr = std::env::var("API_ADDR").unwrap_or(defaults.api_addr);

        let reload_method = match std::env::var("RELOAD_METHOD") {
            Ok(v) => v.parse::<ReloadMethod>()?,
            Err(_) => defaults.reload_method,
        };

        let reload_command = std::env::var("RELOAD_COMMAND").unwrap_or(defaults.reload_command);
        let rndc_path = std::env::var("RNDC_PATH").unwrap_or(defaults.rndc_path);
        let zone_name =
            std::env::var("WL_ZONE_NAME").unwrap_or_else(|_| zone_name_from_file(&zone_file_name));

        let reload_timeout = std::env::var("RELOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.reload_timeout);

        let rollback_on_reload_failure = std::env::var("ROLLBACK_ON_RELOAD_FAILURE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.rollback_on_reload_failure);

        Ok(Self {
            zone_dir,
            zone_file_name,
            api_addr,
            reload_method,
            reload_command,
            rndc_path,
            zone_name,
            reload_timeout,
            rollback_on_reload_failure,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.zone_file_name.is_empty() || self.zone_file_name.contains('/') {
            return Err(format!(
                "zone file name must be a plain file name, got {:?}",
                self.zone_file_name
            ));
        }

        if self.reload_timeout.is_zero() {
            return Err("reload timeout must be greater than 0".to_string());
        }

        match self.reload_method {
            ReloadMethod::Command if self.reload_command.trim().is_empty() => {
                Err("reload command cannot be empty".to_string())
            }
            ReloadMethod::Rndc if self.zone_name.is_empty() => {
                Err("zone name cannot be empty when reloading via rndc".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Full path of the whitelist zone file
    pub fn zone_file(&self) -> PathBuf {
        self.zone_dir.join(&self.zone_file_name)
    }

    /// RNDC executor for the whitelist zone, when reloading via rndc
    pub fn rndc(&self) -> Option<RndcExecutor> {
        (self.reload_method == ReloadMethod::Rndc).then(|| {
            RndcExecutor::new(
                Some(self.rndc_path.clone()),
                self.zone_name.clone(),
                self.reload_timeout,
            )
        })
    }

    /// Reloader for the configured method
    pub fn reloader(&self) -> Result<Arc<dyn ZoneReloader>, ReloadError> {
        match self.rndc() {
            Some(rndc) => Ok(Arc::new(rndc)),
            None => Ok(Arc::new(CommandReloader::from_command_line(
                &self.reload_command,
                self.reload_timeout,
            )?)),
        }
    }
}
