/// Background task implementations
use crate::{context::AppContext, error::TourResult};
use std::time::Duration;

/// Delete uploads that no tour references and that are older than `grace`
///
/// The grace period covers files stored by a request whose tour row is not
/// committed yet.
pub async fn sweep_orphaned_blobs(ctx: &AppContext, grace: Duration) -> TourResult<u64> {
    ctx.tours.reconcile_blobs(grace).await
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> TourResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}
