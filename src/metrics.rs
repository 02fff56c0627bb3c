/// Metrics and telemetry for the tour server
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Tour lifecycle operations
/// - Blob uploads and deletions
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("http_requests_total registers once");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("http_request_duration_seconds registers once");

    // ========== Tour Metrics ==========

    /// Committed tour writes by operation
    pub static ref TOUR_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tour_operations_total",
        "Total number of committed tour operations",
        &["operation"]
    )
    .expect("tour_operations_total registers once");

    // ========== Blob Storage Metrics ==========

    /// Stored uploads
    pub static ref BLOB_UPLOADS_TOTAL: IntCounter = register_int_counter!(
        "blob_uploads_total",
        "Total number of stored uploads"
    )
    .expect("blob_uploads_total registers once");

    /// Bytes written by uploads
    pub static ref BLOB_UPLOAD_BYTES_TOTAL: IntCounter = register_int_counter!(
        "blob_upload_bytes_total",
        "Total bytes written by uploads"
    )
    .expect("blob_upload_bytes_total registers once");

    /// Blob deletions by outcome
    pub static ref BLOB_DELETIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blob_deletions_total",
        "Total number of blob deletions",
        &["status"]
    )
    .expect("blob_deletions_total registers once");

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .expect("background_jobs_total registers once");

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("background_job_duration_seconds registers once");

    // ========== Error Metrics ==========

    /// Server errors by error type
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of server errors",
        &["error_type"]
    )
    .expect("errors_total registers once");
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
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

/// Record a committed tour write
pub fn record_tour_operation(operation: &str) {
    TOUR_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

/// Record a stored upload
pub fn record_blob_upload(bytes: usize) {
    BLOB_UPLOADS_TOTAL.inc();
    BLOB_UPLOAD_BYTES_TOTAL.inc_by(bytes as u64);
}

/// Record a blob deletion attempt
pub fn record_blob_deletion(success: bool) {
    BLOB_DELETIONS_TOTAL
        .with_label_values(&[if success { "success" } else { "failure" }])
        .inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record a server error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
