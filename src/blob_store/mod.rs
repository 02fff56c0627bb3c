/// Blob Storage System
///
/// Handles the uploaded image files referenced by tours.
/// The backend trait keeps the manager independent of where bytes live.

pub mod disk;
pub mod models;
pub mod store;

pub use models::*;
pub use store::BlobStore;

use crate::error::TourResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob data.
/// Names are plain file names produced by [`BlobStore`].
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store a blob under a new name; fails with `Conflict` if the name is taken
    async fn put(&self, name: &str, data: Vec<u8>) -> TourResult<()>;

    /// Delete a blob by name; absent blobs are not an error
    async fn delete(&self, name: &str) -> TourResult<()>;

    /// List every stored blob
    async fn list(&self) -> TourResult<Vec<BlobEntry>>;
}

/// Configuration for blob storage
#[derive(Debug, Clone)]
pub struct BlobStorageConfig {
    /// Backend type
    pub backend: BlobBackendType,

    /// Files of this many bytes or more are rejected
    pub max_blob_size: usize,

    /// URL prefix under which blobs are served
    pub public_path: String,
}

impl BlobStorageConfig {
    pub fn from_upload_config(uploads: &crate::config::UploadConfig) -> Self {
        Self {
            backend: BlobBackendType::Disk {
                location: uploads.directory.clone(),
            },
            max_blob_size: uploads.max_file_size,
            public_path: uploads.public_path.clone(),
        }
    }
}

/// Backend types for blob storage
#[derive(Debug, Clone)]
pub enum BlobBackendType {
    /// Store blobs on local disk
    Disk { location: PathBuf },
}
