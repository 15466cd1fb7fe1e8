//! Metrics module
//!
//! Prometheus counters and histograms for the API server and the upload
//! pipeline.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "edulang_http_requests_total",
        "Total HTTP requests by route and status code",
        &["route", "status"]
    ).unwrap();

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "edulang_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["route"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "edulang_auth_attempts_total",
        "Authentication attempts",
        &["method", "status"]
    ).unwrap();

    // Upload metrics
    pub static ref UPLOAD_TARGETS_ISSUED: CounterVec = register_counter_vec!(
        "edulang_upload_targets_issued_total",
        "Presigned upload targets issued",
        &["storage"]
    ).unwrap();

    pub static ref PIPELINE_FILES: CounterVec = register_counter_vec!(
        "edulang_pipeline_files_total",
        "Files through the upload pipeline by outcome",
        &["outcome"]  // "success", "transfer" or "persist"
    ).unwrap();

    // AI proxy metrics
    pub static ref AI_CALLS: CounterVec = register_counter_vec!(
        "edulang_ai_calls_total",
        "Calls to external AI services",
        &["service", "status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "edulang_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a handled HTTP request
pub fn record_http_request(route: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route, status.to_string().as_str()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[route])
        .observe(duration_secs);
}

/// Record authentication attempt
pub fn record_auth_attempt(method: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[method, status]).inc();
}

/// Record a presigned S3 upload target
pub fn record_upload_target_issued() {
    UPLOAD_TARGETS_ISSUED.with_label_values(&["s3"]).inc();
}

/// Record one file's pipeline outcome
pub fn record_pipeline_file(outcome: &str) {
    PIPELINE_FILES.with_label_values(&[outcome]).inc();
}

/// Record an AI service call
pub fn record_ai_call(service: &str, status: &str) {
    AI_CALLS.with_label_values(&[service, status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
