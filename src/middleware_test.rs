// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for middleware module

use super::middleware::*;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower::ServiceExt;

async fn test_handler() -> impl IntoResponse {
    (StatusCode::OK, "success")
}

async fn test_handler_error() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "error")
}

fn requests(method: &str, path: &str, status: &str) -> f64 {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status])
        .get()
}

#[tokio::test]
async fn test_track_metrics_success() {
    let app = Router::new()
        .route("/mw-success", get(test_handler))
        .route_layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .uri("/mw-success")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Verify metrics were recorded
    assert_eq!(requests("GET", "/mw-success", "200"), 1.0);
}

#[tokio::test]
async fn test_track_metrics_error_response() {
    let app = Router::new()
        .route("/mw-error", post(test_handler_error))
        .route_layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .method("POST")
        .uri("/mw-error")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert_eq!(requests("POST", "/mw-error", "502"), 1.0);
}

#[tokio::test]
async fn test_track_metrics_uses_route_template() {
    let app = Router::new()
        .route("/mw-zones/{name}", get(test_handler))
        .route_layer(middleware::from_fn(track_metrics));

    for name in ["a.example.", "b.example."] {
        let request = Request::builder()
            .uri(format!("/mw-zones/{}", name))
            .body(Body::empty())
            .unwrap();
        let _ = app.clone().oneshot(request).await.unwrap();
    }

    assert_eq!(requests("GET", "/mw-zones/{name}", "200"), 2.0);
}

#[tokio::test]
async fn test_track_metrics_unmatched_path() {
    let app = Router::new()
        .route("/mw-known", get(test_handler))
        .layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .uri("/mw-unknown/path")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let metrics_output = crate::metrics::gather_metrics().unwrap();
    assert!(metrics_output.contains("path=\"unmatched\""));
}
