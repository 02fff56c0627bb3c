/// Blob Store Manager
///
/// Names uploaded files, enforces the size limit and maps stored blobs
/// to and from their public URLs.
use crate::{
    blob_store::{
        disk::DiskBlobBackend, BlobBackend, BlobBackendType, BlobEntry, BlobRef,
        BlobStorageConfig,
    },
    error::{TourError, TourResult},
    metrics,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;

/// How many suffixed names to try when a generated name is already taken
const MAX_NAME_ATTEMPTS: u32 = 5;

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStorageConfig,
    backend: Arc<dyn BlobBackend>,
}

impl BlobStore {
    /// Create a new blob store
    pub fn new(config: BlobStorageConfig) -> TourResult<Self> {
        let backend: Arc<dyn BlobBackend> = match &config.backend {
            BlobBackendType::Disk { location } => Arc::new(DiskBlobBackend::new(location.clone())),
        };

        Ok(Self { config, backend })
    }

    pub fn public_path(&self) -> &str {
        &self.config.public_path
    }

    /// Reject files at or over the configured limit
    pub fn validate_size(&self, original_name: &str, size: usize) -> TourResult<()> {
        if size >= self.config.max_blob_size {
            return Err(TourError::PayloadTooLarge(format!(
                "File {} is {} bytes; files must be smaller than {} bytes",
                original_name, size, self.config.max_blob_size
            )));
        }
        Ok(())
    }

    /// Store an uploaded file under a freshly generated name
    pub async fn store(&self, original_name: &str, data: Vec<u8>) -> TourResult<BlobRef> {
        let size = data.len();
        self.validate_size(original_name, size)?;

        let timestamp = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = generate_blob_name(original_name, timestamp, attempt);

            match self.backend.put(&name, data.clone()).await {
                Ok(()) => {
                    tracing::debug!("Stored blob {} ({} bytes) for {}", name, size, original_name);
                    metrics::record_blob_upload(size);
                    return Ok(BlobRef::new(name));
                }
                Err(TourError::Conflict(_)) => {
                    tracing::debug!("Blob name {} already taken, retrying", name);
                }
                Err(e) => return Err(e),
            }
        }

        Err(TourError::BlobStorage(format!(
            "Could not find a free name for {} after {} attempts",
            original_name, MAX_NAME_ATTEMPTS
        )))
    }

    /// Delete a blob; deleting an absent blob succeeds
    pub async fn delete(&self, blob: &BlobRef) -> TourResult<()> {
        let result = self.backend.delete(&blob.name).await;
        metrics::record_blob_deletion(result.is_ok());
        result
    }

    pub async fn list(&self) -> TourResult<Vec<BlobEntry>> {
        self.backend.list().await
    }

    /// Public URL of a stored blob
    pub fn url_for(&self, blob: &BlobRef) -> String {
        format!("{}/{}", self.config.public_path.trim_end_matches('/'), blob.name)
    }

    /// Parse a public URL back into a blob reference
    ///
    /// Only URLs directly under the public path naming a plain file are
    /// accepted, so stored URLs can never address anything outside the
    /// blob directory.
    pub fn from_url(&self, url: &str) -> Option<BlobRef> {
        let prefix = format!("{}/", self.config.public_path.trim_end_matches('/'));
        let name = url.strip_prefix(&prefix)?;
        is_plain_file_name(name).then(|| BlobRef::new(name))
    }

    /// Delete the blobs behind a list of URLs, logging failures
    ///
    /// Returns how many blobs were removed.
    pub async fn delete_urls(&self, urls: &[String]) -> usize {
        let blobs: Vec<BlobRef> = urls
            .iter()
            .filter_map(|url| {
                let blob = self.from_url(url);
                if blob.is_none() {
                    tracing::warn!("Not deleting blob for unrecognised image URL {}", url);
                }
                blob
            })
            .collect();

        let results = join_all(blobs.iter().map(|blob| self.delete(blob))).await;

        let mut deleted = 0;
        for (blob, result) in blobs.iter().zip(results) {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => tracing::error!("Error deleting file {}: {}", blob, e),
            }
        }
        deleted
    }
}

/// Build the stored name for an upload: `{stem}-{millis}{ext}`
///
/// `attempt` > 0 appends a counter ahead of the extension.
pub fn generate_blob_name(original_name: &str, timestamp_millis: i64, attempt: u32) -> String {
    let base = original_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let stem: String = base
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "upload".to_string() } else { stem };

    let extension = match base.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext: String = base[idx + 1..]
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            if ext.is_empty() {
                String::new()
            } else {
                format!(".{}", ext)
            }
        }
        _ => String::new(),
    };

    if attempt == 0 {
        format!("{}-{}{}", stem, timestamp_millis, extension)
    } else {
        format!("{}-{}-{}{}", stem, timestamp_millis, attempt, extension)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c| c == '/' || c == '\\' || c == '\0')
}
