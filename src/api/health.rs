/// Health check endpoints for liveness and readiness probes
///
/// Supports two types of probes:
/// - Liveness: Is the process alive and responding?
/// - Readiness: Can it serve traffic? (database reachable, upload directory usable)

use crate::{
    context::AppContext,
    error::{TourError, TourResult},
};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    /// Application version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: f64,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn from_result(
        name: &str,
        result: TourResult<()>,
        start: Instant,
        failure_status: &str,
        details: serde_json::Value,
    ) -> Self {
        let response_time_ms = Some(start.elapsed().as_millis() as u64);

        match result {
            Ok(()) => Self {
                name: name.to_string(),
                status: "healthy".to_string(),
                response_time_ms,
                error: None,
                details: Some(details),
            },
            Err(e) => Self {
                name: name.to_string(),
                status: failure_status.to_string(),
                response_time_ms,
                error: Some(e.to_string()),
                details: None,
            },
        }
    }
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe
///
/// If we can respond, we're alive.
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
///
/// Returns 503 when the database or the upload directory is unavailable.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if let Err(e) = check_upload_directory(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: upload directory check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();

    let check_start = Instant::now();
    let database = ComponentHealth::from_result(
        "database",
        check_database(&ctx).await,
        check_start,
        "unhealthy",
        serde_json::json!({
            "type": "sqlite",
            "pool_size": ctx.db.size(),
        }),
    );

    let check_start = Instant::now();
    let uploads = ComponentHealth::from_result(
        "blob_storage",
        check_upload_directory(&ctx).await,
        check_start,
        "unhealthy",
        serde_json::json!({
            "type": "disk",
            "public_path": ctx.blob_store.public_path(),
        }),
    );

    let background = check_orphan_sweep(&ctx);

    let checks = vec![database, uploads, background];
    let overall_status = determine_overall_status(&checks);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: ctx.config.service.version.clone(),
        uptime_seconds: ctx.started_at.elapsed().as_secs_f64(),
        checks,
        message: if overall_status == "healthy" {
            None
        } else {
            Some("One or more components are unhealthy".to_string())
        },
    };

    let status_code = match overall_status.as_str() {
        "healthy" | "degraded" => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (status_code, Json(health))
}

/// Check database connectivity
async fn check_database(ctx: &AppContext) -> TourResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

/// Check that the upload directory exists and is writable
async fn check_upload_directory(ctx: &AppContext) -> TourResult<()> {
    let dir = &ctx.config.uploads.directory;
    let metadata = tokio::fs::metadata(dir).await?;

    if !metadata.is_dir() {
        return Err(TourError::BlobStorage(format!("{:?} is not a directory", dir)));
    }
    if metadata.permissions().readonly() {
        return Err(TourError::BlobStorage(format!("{:?} is read-only", dir)));
    }

    Ok(())
}

/// Report the latest orphan sweep outcome
///
/// A failing sweep is degraded, not critical: requests are still served.
fn check_orphan_sweep(ctx: &AppContext) -> ComponentHealth {
    let enabled = ctx.config.cleanup.orphan_sweep_enabled;
    let status = &ctx.sweep_status;
    let details = serde_json::json!({
        "enabled": enabled,
        "interval_secs": ctx.config.cleanup.orphan_sweep_interval_secs,
        "last_success": status.last_success().map(|t| t.to_rfc3339()),
        "last_failure": status.last_failure().map(|t| t.to_rfc3339()),
    });

    let failing = enabled && status.is_failing();
    ComponentHealth {
        name: "orphan_sweep".to_string(),
        status: if failing { "degraded" } else { "healthy" }.to_string(),
        response_time_ms: None,
        error: failing.then(|| "Last orphan sweep failed".to_string()),
        details: Some(details),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();
    let degraded_count = checks.iter().filter(|c| c.status == "degraded").count();

    if unhealthy_count > 0 {
        "unhealthy".to_string()
    } else if degraded_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
