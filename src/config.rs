/// Configuration management for the tour server
use crate::error::{TourError, TourResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default per-file upload limit (15 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 15 * 1024 * 1024;

/// Default number of files accepted in one request
pub const DEFAULT_MAX_FILES: usize = 15;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
}

/// Uploaded image storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory holding blob files
    pub directory: PathBuf,
    /// URL prefix the directory is served under
    pub public_path: String,
    /// Files of this size or larger are rejected
    pub max_file_size: usize,
    pub max_files: usize,
}

/// Orphaned blob reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub orphan_sweep_enabled: bool,
    pub orphan_sweep_interval_secs: u64,
    pub orphan_grace_period_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = TourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(TourError::Config(format!("Invalid log format: {}", other))),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: 7000,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://./data/tours.sqlite".to_string(),
                max_connections: 10,
            },
            uploads: UploadConfig {
                directory: PathBuf::from("./uploads"),
                public_path: "/uploads".to_string(),
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                max_files: DEFAULT_MAX_FILES,
            },
            cleanup: CleanupConfig {
                orphan_sweep_enabled: true,
                orphan_sweep_interval_secs: 3600,
                orphan_grace_period_secs: 3600,
            },
            logging: LoggingConfig {
                level: "tour_server=debug,tower_http=debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when unset
fn env_parse<T: FromStr>(key: &str, default: T) -> TourResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TourError::Config(format!("Invalid value for {}: {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TourResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let hostname = env::var("TOUR_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = env_parse("PORT", defaults.service.port)?;

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.storage.database_url);
        let max_connections =
            env_parse("TOUR_DB_MAX_CONNECTIONS", defaults.storage.max_connections)?;

        let directory = env::var("TOUR_UPLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or(defaults.uploads.directory);
        let max_file_size =
            env_parse("TOUR_UPLOAD_MAX_FILE_SIZE", defaults.uploads.max_file_size)?;
        let max_files = env_parse("TOUR_UPLOAD_MAX_FILES", defaults.uploads.max_files)?;

        let orphan_sweep_enabled = env_parse(
            "TOUR_ORPHAN_SWEEP_ENABLED",
            defaults.cleanup.orphan_sweep_enabled,
        )?;
        let orphan_sweep_interval_secs = env_parse(
            "TOUR_ORPHAN_SWEEP_INTERVAL_SECS",
            defaults.cleanup.orphan_sweep_interval_secs,
        )?;
        let orphan_grace_period_secs = env_parse(
            "TOUR_ORPHAN_GRACE_PERIOD_SECS",
            defaults.cleanup.orphan_grace_period_secs,
        )?;

        let level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);
        let format = env_parse("TOUR_LOG_FORMAT", defaults.logging.format)?;

        let config = ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version: defaults.service.version,
            },
            storage: StorageConfig {
                database_url,
                max_connections,
            },
            uploads: UploadConfig {
                directory,
                public_path: defaults.uploads.public_path,
                max_file_size,
                max_files,
            },
            cleanup: CleanupConfig {
                orphan_sweep_enabled,
                orphan_sweep_interval_secs,
                orphan_grace_period_secs,
            },
            logging: LoggingConfig { level, format },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> TourResult<()> {
        if self.service.hostname.is_empty() {
            return Err(TourError::Config("Hostname cannot be empty".to_string()));
        }

        if self.storage.database_url.is_empty() {
            return Err(TourError::Config("DATABASE_URL cannot be empty".to_string()));
        }

        if self.storage.max_connections == 0 {
            return Err(TourError::Config(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        if self.uploads.max_file_size == 0 || self.uploads.max_files == 0 {
            return Err(TourError::Config(
                "Upload limits must be greater than zero".to_string(),
            ));
        }

        if self.cleanup.orphan_sweep_enabled && self.cleanup.orphan_sweep_interval_secs == 0 {
            return Err(TourError::Config(
                "Orphan sweep interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Largest request body the upload routes accept
    pub fn request_body_limit(&self) -> usize {
        // Multipart framing and text fields need some room on top of the files
        const FORM_OVERHEAD: usize = 1024 * 1024;

        self.uploads
            .max_file_size
            .saturating_mul(self.uploads.max_files)
            .saturating_add(FORM_OVERHEAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.service.port, 7000);
        assert_eq!(config.uploads.max_file_size, 15 * 1024 * 1024);
        assert_eq!(config.uploads.max_files, 15);
        assert_eq!(config.uploads.public_path, "/uploads");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ServerConfig::default();
        config.uploads.max_files = 0;
        assert!(matches!(config.validate(), Err(TourError::Config(_))));

        let mut config = ServerConfig::default();
        config.storage.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_request_body_limit_covers_all_files() {
        let config = ServerConfig::default();
        assert!(config.request_body_limit() > 15 * 15 * 1024 * 1024);
    }
}
