// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for rpzwl
//!
//! This module provides metrics for monitoring the whitelist API server:
//! - HTTP request metrics (count, duration, status codes)
//! - Whitelist update metrics by action and outcome
//! - Reload and RNDC command execution metrics
//! - Current serial and record count of the managed zone

use lazy_static::lazy_static;
use prometheus::{
    opts, register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// HTTP request counter by method, path, and status code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "rpzwl_http_requests_total",
            "Total number of HTTP requests processed"
        ),
        &["method", "path", "status"]
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration histogram
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "rpzwl_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Whitelist updates by action and result code
    pub static ref WHITELIST_UPDATES_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "rpzwl_whitelist_updates_total",
            "Total number of whitelist zone updates"
        ),
        &["action", "result"]
    )
    .expect("Failed to create WHITELIST_UPDATES_TOTAL metric");

    /// Reload attempts by backend and result
    pub static ref RELOADS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "rpzwl_reloads_total",
            "Total number of DNS server reload attempts"
        ),
        &["backend", "result"]
    )
    .expect("Failed to create RELOADS_TOTAL metric");

    /// Reload duration histogram
    pub static ref RELOAD_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "rpzwl_reload_duration_seconds",
        "DNS server reload duration in seconds",
        &["backend"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create RELOAD_DURATION_SECONDS metric");

    /// RNDC command counter by command and result
    pub static ref RNDC_COMMANDS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "rpzwl_rndc_commands_total",
            "Total number of RNDC commands executed"
        ),
        &["command", "result"]
    )
    .expect("Failed to create RNDC_COMMANDS_TOTAL metric");

    /// RNDC command duration histogram
    pub static ref RNDC_COMMAND_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "rpzwl_rndc_command_duration_seconds",
        "RNDC command execution duration in seconds",
        &["command"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create RNDC_COMMAND_DURATION_SECONDS metric");

    /// Serial of the whitelist zone after the last committed update
    pub static ref ZONE_SERIAL: Gauge = register_gauge!(
        opts!(
            "rpzwl_zone_serial",
            "Serial number of the whitelist zone"
        )
    )
    .expect("Failed to create ZONE_SERIAL metric");

    /// Number of whitelist records after the last committed update
    pub static ref WHITELIST_RECORDS: Gauge = register_gauge!(
        opts!(
            "rpzwl_whitelist_records",
            "Number of records in the whitelist zone"
        )
    )
    .expect("Failed to create WHITELIST_RECORDS metric");

    /// Application info metric
    pub static ref APP_INFO: CounterVec = register_counter_vec!(
        opts!(
            "rpzwl_app_info",
            "Application information"
        ),
        &["version"]
    )
    .expect("Failed to create APP_INFO metric");
}

/// Initialize metrics with application info
pub fn init_metrics() {
    APP_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .inc();
}

/// Generate metrics output in Prometheus format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a whitelist update; `code` is the error code of a failed update
pub fn record_whitelist_update(action: &str, code: Option<u32>) {
    let result = code.map_or_else(|| "success".to_string(), |c| c.to_string());
    WHITELIST_UPDATES_TOTAL
        .with_label_values(&[action, &result])
        .inc();
}

/// Record a reload attempt
pub fn record_reload(backend: &str, success: bool, duration: f64) {
    let result = if success { "success" } else { "error" };
    RELOADS_TOTAL.with_label_values(&[backend, result]).inc();
    RELOAD_DURATION_SECONDS
        .with_label_values(&[backend])
        .observe(duration);
}

/// Record an RNDC command execution
pub fn record_rndc_command(command: &str, success: bool, duration: f64) {
    let result = if success { "success" } else { "error" };
    RNDC_COMMANDS_TOTAL
        .with_label_values(&[command, result])
        .inc();
    RNDC_COMMAND_DURATION_SECONDS
        .with_label_values(&[command])
        .observe(duration);
}

/// Update the zone gauges after a commit
pub fn update_zone_state(serial: u32, records: usize) {
    ZONE_SERIAL.set(f64::from(serial));
    WHITELIST_RECORDS.set(records as f64);
}
