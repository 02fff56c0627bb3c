/// Application context and dependency injection
use crate::{
    blob_store::{BlobStorageConfig, BlobStore},
    config::ServerConfig,
    db,
    error::{TourError, TourResult},
    jobs::SweepStatus,
    tour::TourService,
    tour_store::{SqliteTourRepository, TourRepository},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub blob_store: Arc<BlobStore>,
    pub tours: Arc<TourService>,
    pub sweep_status: Arc<SweepStatus>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> TourResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create upload directory if it doesn't exist
        Self::ensure_directories(&config).await?;

        // Initialize database
        let db = db::create_pool(
            &config.storage.database_url,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        let repository: Arc<dyn TourRepository> = Arc::new(SqliteTourRepository::new(db.clone()));

        Self::from_parts(config, db, repository)
    }

    /// Assemble a context around an existing pool and repository
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        repository: Arc<dyn TourRepository>,
    ) -> TourResult<Self> {
        let blob_store = Arc::new(BlobStore::new(BlobStorageConfig::from_upload_config(
            &config.uploads,
        ))?);

        let tours = Arc::new(TourService::new(
            repository,
            Arc::clone(&blob_store),
            config.uploads.max_files,
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            blob_store,
            tours,
            sweep_status: Arc::new(SweepStatus::default()),
            started_at: Instant::now(),
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> TourResult<()> {
        let dir = &config.uploads.directory;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            TourError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
        })?;

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
