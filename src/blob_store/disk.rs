/// Disk-based blob storage backend
use crate::{
    blob_store::{BlobBackend, BlobEntry},
    error::{TourError, TourResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt};

/// Disk storage backend
///
/// Stores blobs flat in one directory so the directory can be served
/// as-is under the public upload path.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a blob name
    fn get_blob_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Ensure the blob directory exists
    async fn ensure_base_dir(&self) -> TourResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            TourError::BlobStorage(format!("Failed to create blob directory: {}", e))
        })
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, name: &str, data: Vec<u8>) -> TourResult<()> {
        self.ensure_base_dir().await?;
        let blob_path = self.get_blob_path(name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&blob_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TourError::Conflict(format!("Blob {} already exists", name)));
            }
            Err(e) => {
                return Err(TourError::BlobStorage(format!(
                    "Failed to create blob {}: {}",
                    name, e
                )));
            }
        };

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Don't leave a truncated file behind under a servable name
            let _ = fs::remove_file(&blob_path).await;
            return Err(TourError::BlobStorage(format!(
                "Failed to write blob {}: {}",
                name, e
            )));
        }

        Ok(())
    }

    async fn delete(&self, name: &str) -> TourResult<()> {
        let blob_path = self.get_blob_path(name);

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TourError::BlobStorage(format!(
                "Failed to delete blob {}: {}",
                name, e
            ))),
        }
    }

    async fn list(&self) -> TourResult<Vec<BlobEntry>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TourError::BlobStorage(format!(
                    "Failed to list blob directory: {}",
                    e
                )))
            }
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(String::from) else {
                tracing::warn!("Skipping blob with non UTF-8 name: {:?}", entry.file_name());
                continue;
            };

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            blobs.push(BlobEntry {
                name,
                size: metadata.len(),
                modified_at,
            });
        }

        Ok(blobs)
    }
}
