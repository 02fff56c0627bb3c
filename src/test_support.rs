//! Shared helpers for unit tests
use crate::{config::ServerConfig, context::AppContext, db, tour_store::SqliteTourRepository};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "tour-test-boundary";

/// Poll `condition` until it holds or two seconds pass
///
/// Blob cleanup after update/delete runs in the background.
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Context over an in-memory database and a temporary upload directory
pub async fn test_context(max_file_size: usize, max_files: usize) -> (TempDir, AppContext) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = ServerConfig::default();
    config.storage.database_url = "sqlite::memory:".to_string();
    config.uploads.directory = dir.path().to_path_buf();
    config.uploads.max_file_size = max_file_size;
    config.uploads.max_files = max_files;

    let pool = db::memory_pool().await;
    let repository = Arc::new(SqliteTourRepository::new(pool.clone()));
    let ctx = AppContext::from_parts(config, pool, repository).unwrap();

    (dir, ctx)
}

/// One part of a multipart/form-data body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode parts as a multipart/form-data body using [`BOUNDARY`]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
