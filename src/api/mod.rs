/// API routes and handlers
pub mod health;
pub mod middleware;
pub mod tours;

use crate::{context::AppContext, metrics};
use axum::{http::header, response::IntoResponse, routing::get, Router};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(tours::routes())
        .merge(health::routes())
        .route("/metrics", get(metrics_handler))
}

/// Prometheus scrape endpoint
async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
