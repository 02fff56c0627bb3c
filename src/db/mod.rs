/// Database layer for the tour server
///
/// Manages the SQLite connection pool and embedded migrations.
use crate::error::{TourError, TourResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool from a connection string
///
/// In-memory databases are pinned to a single connection that never
/// expires, since every SQLite connection to `:memory:` is its own database.
pub async fn create_pool(url: &str, options: DatabaseOptions) -> TourResult<SqlitePool> {
    let in_memory = url.contains(":memory:");

    let mut connect_options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !in_memory {
        // Ensure parent directory exists
        if let Some(parent) = connect_options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        connect_options = connect_options.journal_mode(if options.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        });
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(options.max_connections)
    };

    let pool = pool_options.connect_with(connect_options).await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> TourResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| TourError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> TourResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Fresh migrated in-memory database for tests
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = create_pool("sqlite::memory:", DatabaseOptions::default())
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
