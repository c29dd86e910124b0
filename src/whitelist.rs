// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whitelist request model and boundary validation
//!
//! The inbound payload looks like:
//!
//! ```json
//! { "action": "dns_wl_set", "data": { "wl_domain": ["a.example.", "b.example."] } }
//! ```
//!
//! It is deserialized into [`WhitelistPayload`], an adjacently tagged enum, and then
//! normalized into a [`WhitelistRequest`] with a deduplicated domain list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

/// Wire value of the add action
pub const ACTION_SET: &str = "dns_wl_set";
/// Wire value of the remove action
pub const ACTION_DEL: &str = "dns_wl_del";

/// Whitelist request as it arrives on the wire
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", content = "data")]
pub enum WhitelistPayload {
    /// Add domains to the whitelist
    #[serde(rename = "dns_wl_set")]
    Set(WhitelistData),

    /// Remove domains from the whitelist
    #[serde(rename = "dns_wl_del")]
    Del(WhitelistData),
}

/// `data` envelope of a whitelist payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WhitelistData {
    /// Domains to add or remove (e.g., "ads.example.com.")
    pub wl_domain: Vec<String>,
}

/// Whitelist action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistAction {
    Add,
    Remove,
}

impl WhitelistAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            WhitelistAction::Add => ACTION_SET,
            WhitelistAction::Remove => ACTION_DEL,
        }
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            WhitelistAction::Add => "add",
            WhitelistAction::Remove => "remove",
        }
    }
}

impl fmt::Display for WhitelistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Can't read json data: {0}")]
    Malformed(String),

    #[error("Invalid domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: &'static str },
}

/// A validated whitelist request
///
/// `domains` is deduplicated and keeps the order of first appearance, which is the
/// order new records are appended to the zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistRequest {
    action: WhitelistAction,
    domains: Vec<String>,
}

impl WhitelistRequest {
    /// Build a request, validating and deduplicating the domains
    pub fn new<I, S>(action: WhitelistAction, domains: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for domain in domains {
            let domain = domain.into();
            validate_domain(&domain)?;
            if seen.insert(domain.clone()) {
                unique.push(domain);
            }
        }

        Ok(Self {
            action,
            domains: unique,
        })
    }

    /// Parse a raw JSON payload into a validated request
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        let payload: WhitelistPayload = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::try_from(payload)
    }

    pub fn action(&self) -> WhitelistAction {
        self.action
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl TryFrom<WhitelistPayload> for WhitelistRequest {
    type Error = ValidationError;

    fn try_from(payload: WhitelistPayload) -> Result<Self, Self::Error> {
        match payload {
            WhitelistPayload::Set(data) => Self::new(WhitelistAction::Add, data.wl_domain),
            WhitelistPayload::Del(data) => Self::new(WhitelistAction::Remove, data.wl_domain),
        }
    }
}

/// Reject domains that would corrupt a tab-delimited zone line
///
/// Domain syntax itself is not checked.
fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    let reason = if domain.is_empty() {
        "domain cannot be empty"
    } else if domain.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "domain cannot contain whitespace or control characters"
    } else if domain.contains(';') {
        "domain cannot contain ';'"
    } else {
        return Ok(());
    };

    Err(ValidationError::InvalidDomain {
        domain: domain.to_string(),
        reason,
    })
}
