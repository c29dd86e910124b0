// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! rpzwl - HTTP API for maintaining a BIND9 response-policy-zone whitelist
//!
//! A whitelist RPZ zone holds one passthru record per exempted domain:
//!
//! ```text
//! ads.example.com.		CNAME	rpz-passthru.
//! ```
//!
//! This crate adds and removes those records, bumps the zone serial, and asks the
//! DNS server to reload the zone.
//!
//! # Features
//!
//! - Idempotent add/remove of whitelisted domains
//! - Serial bumped by exactly one per successful update
//! - Backup of the previous zone at `<zone>.bak` before every update
//! - Atomic commit (temporary file + rename), one writer per zone file
//! - Reload via a fixed command or `rndc`, bounded by a timeout
//! - Prometheus metrics integration
//!
//! # Usage
//!
//! ## As a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rpzwl::{CommandReloader, WhitelistAction, WhitelistRequest, ZoneUpdateCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reloader = CommandReloader::from_command_line(
//!         "/usr/sbin/rndc reload wl.rpz",
//!         Duration::from_secs(5),
//!     )?;
//!     let coordinator = ZoneUpdateCoordinator::new(
//!         "/var/lib/bind/zones/master/wl.rpz.zone",
//!         Arc::new(reloader),
//!         false,
//!     );
//!
//!     let request = WhitelistRequest::new(WhitelistAction::Add, ["ads.example.com."])?;
//!     let outcome = coordinator.apply(&request).await?;
//!     println!("zone now at serial {}", outcome.serial.current);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Rewriting Zone Content
//!
//! ```rust
//! use rpzwl::{zonefile, WhitelistAction, WhitelistRequest};
//!
//! let zone = "$TTL 3600\n\t\t\t0000000042\t;Serial\na.example.\t\tCNAME\trpz-passthru.\n";
//! let request = WhitelistRequest::new(WhitelistAction::Add, ["b.example."]).unwrap();
//!
//! let rewrite = zonefile::rewrite(zone, &request).unwrap();
//! assert_eq!(rewrite.serial.current.to_string(), "0000000043");
//! assert!(rewrite.content.ends_with("b.example.\t\tCNAME\trpz-passthru.\n"));
//! ```
//!
//! ## As a Binary
//!
//! ```bash
//! ZONE_DIR=/var/lib/bind/zones/master WL_ZONE_FILE=wl.rpz.zone rpzwl
//! ```

// Re-export public modules
pub mod backup;
pub mod config;
pub mod coordinator;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod reload;
pub mod rndc;
pub mod serial;
pub mod types;
pub mod whitelist;
pub mod zonefile;

// Re-export commonly used types

// Update pipeline
pub use coordinator::{UpdateError, UpdateOutcome, UpdateStage, ZoneUpdateCoordinator};

// Reload backends
pub use reload::{CommandReloader, ReloadError, ZoneReloader};
pub use rndc::RndcExecutor;

// Error types
pub use types::{ApiError, AppState, ErrorResponse};

// Request types
pub use whitelist::{WhitelistAction, WhitelistPayload, WhitelistRequest};

// Test modules
#[cfg(test)]
mod test_support;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod middleware_test;
