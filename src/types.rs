// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common types and errors used throughout the rpzwl library

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{coordinator::UpdateError, coordinator::ZoneUpdateCoordinator, rndc::RndcExecutor};

/// Missing or malformed request fields
pub const VALIDATION_ERROR_CODE: u32 = 14001;
/// Reload of the DNS server failed
pub const RELOAD_ERROR_CODE: u32 = 14002;
/// Zone file could not be backed up, read or written
pub const ZONE_FILE_ERROR_CODE: u32 = 17103;

/// Business-level success marker returned by the update endpoint
pub const SUCCESS_MARKER: &str = "200";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Update pipeline for the whitelist zone
    pub coordinator: Arc<ZoneUpdateCoordinator>,
    /// RNDC executor, when reloads go through rndc
    pub rndc: Option<Arc<RndcExecutor>>,
}

/// Error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: Option<u32>,
    pub error: String,
    pub details: Option<String>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Zone file error: {message}")]
    ZoneFileError {
        message: String,
        stage: Option<String>,
    },

    #[error("Reload failed: {message}")]
    ReloadError {
        message: String,
        rolled_back: bool,
    },

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Numeric error code carried in the response body
    pub fn code(&self) -> Option<u32> {
        match self {
            ApiError::InvalidRequest(_) => Some(VALIDATION_ERROR_CODE),
            ApiError::ZoneFileError { .. } => Some(ZONE_FILE_ERROR_CODE),
            ApiError::ReloadError { .. } => Some(RELOAD_ERROR_CODE),
            ApiError::InternalError(_) => None,
        }
    }
}

impl From<UpdateError> for ApiError {
    fn from(e: UpdateError) -> Self {
        let stage = e.stage().to_string();
        match e {
            UpdateError::Validation(e) => ApiError::InvalidRequest(e.to_string()),
            UpdateError::Reload {
                rolled_back,
                source,
            } => ApiError::ReloadError {
                message: source.to_string(),
                rolled_back,
            },
            other => ApiError::ZoneFileError {
                message: other.to_string(),
                stage: Some(stage),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ZoneFileError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ReloadError { .. } => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match &self {
            ApiError::ZoneFileError { stage, .. } => stage.clone(),
            ApiError::ReloadError { rolled_back, .. } => Some(if *rolled_back {
                "zone restored from backup".to_string()
            } else {
                "zone committed but not reloaded".to_string()
            }),
            _ => None,
        };

        let body = Json(ErrorResponse {
            code: self.code(),
            error: self.to_string(),
            details,
        });

        (status, body).into_response()
    }
}
