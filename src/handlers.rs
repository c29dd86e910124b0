// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Whitelist API handlers
//!
//! This module implements the HTTP handlers for the whitelist zone:
//! - Adding and removing whitelisted domains (`dns_wl_set` / `dns_wl_del`)
//! - Inspecting the current serial and whitelisted domains

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    coordinator::ZoneUpdateCoordinator,
    types::{ApiError, AppState, SUCCESS_MARKER},
    zonefile,
};

/// Current state of the whitelist zone
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistZoneResponse {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<u32>,
    pub domains: Vec<String>,
    pub count: usize,
}

/// Add or remove whitelisted domains
///
/// This endpoint:
/// 1. Validates the payload
/// 2. Backs up the zone file and rewrites it with the next serial
/// 3. Reloads the DNS server
///
/// On success the body is the literal `200`.
#[utoipa::path(
    post,
    path = "/api/v1/dns_set",
    request_body = crate::whitelist::WhitelistPayload,
    responses(
        (status = 200, description = "Whitelist updated", body = String),
        (status = 400, description = "Invalid request (14001)", body = crate::types::ErrorResponse),
        (status = 500, description = "Zone file error (17103)", body = crate::types::ErrorResponse),
        (status = 502, description = "Reload failed (14002)", body = crate::types::ErrorResponse)
    ),
    tag = "whitelist"
)]
pub async fn dns_set(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        error!("Rejected whitelist payload: {}", e.body_text());
        ApiError::InvalidRequest(e.body_text())
    })?;
    let request = ZoneUpdateCoordinator::validate(payload)?;

    // Run detached so a dropped connection cannot stop an update halfway
    let coordinator = state.coordinator.clone();
    let outcome = tokio::spawn(async move { coordinator.apply(&request).await })
        .await
        .map_err(|e| {
            error!("Whitelist update task failed: {}", e);
            ApiError::InternalError(format!("Whitelist update task failed: {}", e))
        })??;

    info!(
        "Whitelist update done at serial {}: {} added, {} removed",
        outcome.serial.current,
        outcome.added.len(),
        outcome.removed.len()
    );

    Ok(SUCCESS_MARKER)
}

/// Get the whitelist zone
#[utoipa::path(
    get,
    path = "/api/v1/zone",
    responses(
        (status = 200, description = "Whitelist zone information", body = WhitelistZoneResponse),
        (status = 500, description = "Zone file error (17103)", body = crate::types::ErrorResponse)
    ),
    tag = "whitelist"
)]
pub async fn get_zone(State(state): State<AppState>) -> Result<Json<WhitelistZoneResponse>, ApiError> {
    let path = state.coordinator.zone_file();
    info!("Reading whitelist zone {}", path.display());

    let zone_err = |e: zonefile::ZoneFileError| {
        error!("Failed to read whitelist zone {}: {}", path.display(), e);
        ApiError::ZoneFileError {
            message: e.to_string(),
            stage: None,
        }
    };

    let content = zonefile::read(path).await.map_err(zone_err)?;
    let summary = zonefile::summarize(&content).map_err(zone_err)?;
    let count = summary.domains.len();

    Ok(Json(WhitelistZoneResponse {
        file_path: path.display().to_string(),
        serial: summary.serial.map(|s| s.value()),
        domains: summary.domains,
        count,
    }))
}
