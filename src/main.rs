/// Tour Server
///
/// REST backend for tour listings with image uploads stored on local disk
/// and served back under a public URL prefix.

mod api;
mod blob_store;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod metrics;
mod server;
mod tour;
mod tour_store;

#[cfg(test)]
mod test_support;

use config::{LogFormat, ServerConfig};
use context::AppContext;
use error::TourResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> TourResult<()> {
    // Load configuration (also reads .env)
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_logging(&config);

    // Print banner
    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("tour_server=debug,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

fn print_banner() {
    println!(
        r#"
  _____
 |_   _|__  _  _ _ _
   | |/ _ \| || | '_|
   |_|\___/ \_,_|_|

        Tour Server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
