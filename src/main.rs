// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RPZ Whitelist API Server
//!
//! A lightweight HTTP API server that maintains a BIND9 RPZ whitelist zone by:
//! - Adding and removing `rpz-passthru.` records in the zone file
//! - Bumping the zone serial on every change
//! - Reloading BIND9 through a fixed command or rndc
//!
//! This server runs next to BIND9 and needs write access to the zone directory.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Import from the library
use rpzwl::{
    config::Config,
    coordinator::ZoneUpdateCoordinator,
    handlers, metrics, middleware,
    types::{AppState, ErrorResponse},
    zonefile,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(handlers::dns_set, handlers::get_zone),
    components(
        schemas(
            rpzwl::whitelist::WhitelistPayload,
            rpzwl::whitelist::WhitelistData,
            handlers::WhitelistZoneResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "whitelist", description = "RPZ whitelist management endpoints")
    ),
    info(
        title = "rpzwl API",
        version = "0.1.0",
        description = "HTTP API for maintaining a BIND9 RPZ whitelist zone",
        license(name = "MIT")
    )
)]
struct ApiDoc;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Readiness check response
#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    checks: Vec<String>,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint for Prometheus scraping
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                code: None,
                error: format!("Failed to gather metrics: {}", e),
                details: None,
            }),
        )
            .into_response(),
    }
}

/// Readiness check endpoint
async fn ready_check(State(state): State<AppState>) -> Json<ReadyResponse> {
    let mut checks = Vec::new();
    let mut ready = true;

    // Check that the zone file is readable and carries a serial
    let zone_file = state.coordinator.zone_file();
    match zonefile::read(zone_file).await {
        Ok(content) => match zonefile::summarize(&content) {
            Ok(summary) if summary.serial.is_some() => {
                checks.push(format!("zone_file_readable: {}", zone_file.display()));
            }
            Ok(_) => {
                ready = false;
                checks.push(format!("zone_file_without_serial: {}", zone_file.display()));
            }
            Err(e) => {
                ready = false;
                checks.push(format!("zone_file_error: {}", e));
            }
        },
        Err(e) => {
            ready = false;
            checks.push(format!("zone_file_error: {}", e));
        }
    }

    // Check if rndc is available
    if let Some(rndc) = &state.rndc {
        match rndc.status().await {
            Ok(_) => {
                checks.push("rndc_available: true".to_string());
            }
            Err(e) => {
                warn!("RNDC not ready: {}", e);
                ready = false;
                checks.push(format!("rndc_error: {}", e));
            }
        }
    }

    Json(ReadyResponse { ready, checks })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("starting rpz whitelist api server v{}", env!("CARGO_PKG_VERSION"));

    // initialize metrics
    metrics::init_metrics();

    // get configuration from environment
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let zone_file = config.zone_file();
    info!("whitelist zone file: {}", zone_file.display());
    info!("api address: {}", config.api_addr);
    info!(
        "reload method: {:?}, timeout: {:?}",
        config.reload_method, config.reload_timeout
    );
    if config.rollback_on_reload_failure {
        info!("zone will be restored from backup when reload fails");
    } else {
        info!("zone stays committed when reload fails");
    }

    // verify zone file exists
    if !tokio::fs::metadata(&zone_file)
        .await
        .with_context(|| format!("zone file not accessible: {}", zone_file.display()))?
        .is_file()
    {
        error!("zone file is not a regular file: {}", zone_file.display());
        return Err(anyhow::anyhow!("zone file not found"));
    }

    // create reload backend
    let reloader = config
        .reloader()
        .context("failed to create reload backend")?;
    info!("reload backend: {}", reloader.name());

    // rndc executor for the readiness check
    let rndc = config.rndc().map(Arc::new);

    // create application state
    let state = AppState {
        coordinator: Arc::new(ZoneUpdateCoordinator::new(
            zone_file,
            reloader,
            config.rollback_on_reload_failure,
        )),
        rndc,
    };

    // build api routes
    let api_routes = Router::new()
        .route("/dns_set", post(handlers::dns_set))
        .route("/zone", get(handlers::get_zone))
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(state.clone());

    // build main router
    let app = Router::new()
        .merge(SwaggerUi::new("/api/v1/docs").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .route("/dns_set", post(handlers::dns_set))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .route_layer(axum_middleware::from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http());

    // start server
    info!("rpz whitelist api server listening on {}", config.api_addr);
    info!(
        "swagger ui available at http://{}/api/v1/docs",
        config.api_addr
    );

    let listener = tokio::net::TcpListener::bind(&config.api_addr).await?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
