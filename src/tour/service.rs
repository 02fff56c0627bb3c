/// Tour service
///
/// The only place that writes both tour records and blob files. Writes are
/// ordered so a committed record never references a missing file:
/// - blobs are stored before the record that references them
/// - superseded blobs are deleted only after the record stops referencing them
/// - blobs stored for a request that then fails are removed again
///
/// Anything left behind by a crash is collected by [`TourService::reconcile_blobs`].
use crate::{
    blob_store::{BlobRef, BlobStore, UploadedFile},
    error::{TourError, TourResult},
    metrics,
    tour::TourSubmission,
    tour_store::{NewTour, Tour, TourPatch, TourRepository},
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const MISSING_IMAGES: &str = "At least one image is required";
const MISSING_FIELDS: &str = "All fields (state, description, places) are required";

/// Orchestrates the tour repository and the blob store
#[derive(Clone)]
pub struct TourService {
    repository: Arc<dyn TourRepository>,
    blob_store: Arc<BlobStore>,
    max_files: usize,
}

impl TourService {
    pub fn new(
        repository: Arc<dyn TourRepository>,
        blob_store: Arc<BlobStore>,
        max_files: usize,
    ) -> Self {
        Self {
            repository,
            blob_store,
            max_files,
        }
    }

    /// Create a tour from text fields and at least one image
    pub async fn create(&self, submission: TourSubmission) -> TourResult<Tour> {
        if submission.images.is_empty() {
            return Err(TourError::Validation(MISSING_IMAGES.to_string()));
        }

        let (Some(state), Some(description), Some(places)) = (
            present(submission.state),
            present(submission.description),
            present(submission.places),
        ) else {
            return Err(TourError::Validation(MISSING_FIELDS.to_string()));
        };

        self.validate_files(&submission.images)?;

        let images = self.store_files(submission.images).await?;

        let new_tour = NewTour {
            state,
            description,
            places,
            images: images.clone(),
        };

        match self.repository.create(new_tour).await {
            Ok(tour) => {
                tracing::info!("Created tour {} with {} image(s)", tour.id, tour.images.len());
                metrics::record_tour_operation("create");
                Ok(tour)
            }
            Err(e) => {
                tracing::error!("Error creating tour: {}", e);
                self.discard(&images).await;
                Err(e)
            }
        }
    }

    /// All tours, unfiltered and unpaginated
    pub async fn list(&self) -> TourResult<Vec<Tour>> {
        self.repository.find_all().await
    }

    pub async fn get(&self, id: &str) -> TourResult<Tour> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| tour_not_found(id))
    }

    /// Merge supplied fields into a tour; new images replace the old set
    pub async fn update(&self, id: &str, submission: TourSubmission) -> TourResult<Tour> {
        let mut patch = TourPatch {
            state: supplied("state", submission.state)?,
            description: supplied("description", submission.description)?,
            places: supplied("places", submission.places)?,
            images: None,
        };

        self.validate_files(&submission.images)?;

        // Unknown ids must not leave freshly stored files behind
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(tour_not_found(id));
        }

        let new_images = if submission.images.is_empty() {
            Vec::new()
        } else {
            let images = self.store_files(submission.images).await?;
            patch.images = Some(images.clone());
            images
        };

        let update = match self.repository.update_by_id(id, patch).await {
            Ok(Some(update)) => update,
            Ok(None) => {
                // Deleted between the existence check and the write
                self.discard(&new_images).await;
                return Err(tour_not_found(id));
            }
            Err(e) => {
                tracing::error!("Error updating tour {}: {}", id, e);
                self.discard(&new_images).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Updated tour {} ({} image(s) replaced)",
            id,
            update.replaced_images.len()
        );
        metrics::record_tour_operation("update");
        self.schedule_cleanup(update.replaced_images);

        Ok(update.tour)
    }

    /// Delete a tour and, afterwards, every image it referenced
    pub async fn delete(&self, id: &str) -> TourResult<Tour> {
        let tour = self
            .repository
            .delete_by_id(id)
            .await?
            .ok_or_else(|| tour_not_found(id))?;

        tracing::info!("Deleted tour {}", tour.id);
        metrics::record_tour_operation("delete");
        self.schedule_cleanup(tour.images.clone());

        Ok(tour)
    }

    /// Remove blob files no tour references that are older than `grace`
    ///
    /// The grace period protects files stored by requests still in flight.
    pub async fn reconcile_blobs(&self, grace: Duration) -> TourResult<u64> {
        let grace = chrono::Duration::from_std(grace)
            .map_err(|e| TourError::Internal(format!("Invalid grace period: {}", e)))?;
        let cutoff = Utc::now() - grace;

        let referenced: HashSet<String> = self
            .repository
            .referenced_images()
            .await?
            .iter()
            .filter_map(|url| self.blob_store.from_url(url))
            .map(|blob| blob.name)
            .collect();

        let mut deleted = 0;
        for entry in self.blob_store.list().await? {
            if referenced.contains(&entry.name) || entry.modified_at > cutoff {
                continue;
            }

            let blob = BlobRef::new(entry.name);
            match self.blob_store.delete(&blob).await {
                Ok(()) => {
                    tracing::info!("Deleted orphaned blob: {} ({} bytes)", blob, entry.size);
                    deleted += 1;
                }
                Err(e) => tracing::warn!("Failed to delete orphaned blob {}: {}", blob, e),
            }
        }

        Ok(deleted)
    }

    fn validate_files(&self, files: &[UploadedFile]) -> TourResult<()> {
        if files.len() > self.max_files {
            return Err(TourError::Validation(format!(
                "Too many images: at most {} per request",
                self.max_files
            )));
        }

        for file in files {
            self.blob_store.validate_size(&file.original_name, file.size())?;
        }

        Ok(())
    }

    /// Store files in upload order, returning their URLs
    ///
    /// On failure the files stored so far are removed before returning.
    async fn store_files(&self, files: Vec<UploadedFile>) -> TourResult<Vec<String>> {
        let mut urls = Vec::with_capacity(files.len());

        for file in files {
            match self.blob_store.store(&file.original_name, file.data).await {
                Ok(blob) => {
                    tracing::debug!(
                        "Stored upload {} as {} ({})",
                        file.original_name,
                        blob,
                        file.content_type.as_deref().unwrap_or("unknown type")
                    );
                    urls.push(self.blob_store.url_for(&blob));
                }
                Err(e) => {
                    tracing::error!("Error storing upload {}: {}", file.original_name, e);
                    self.discard(&urls).await;
                    return Err(e);
                }
            }
        }

        Ok(urls)
    }

    /// Synchronously remove blobs this request stored but never committed
    async fn discard(&self, urls: &[String]) {
        if urls.is_empty() {
            return;
        }
        let removed = self.blob_store.delete_urls(urls).await;
        tracing::warn!("Discarded {} of {} uncommitted upload(s)", removed, urls.len());
    }

    /// Delete superseded blobs in the background
    fn schedule_cleanup(&self, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }

        let blob_store = Arc::clone(&self.blob_store);
        tokio::spawn(async move {
            let removed = blob_store.delete_urls(&urls).await;
            tracing::debug!("Removed {} of {} superseded image(s)", removed, urls.len());
        });
    }
}

/// A text field counts as present when it has non-whitespace content
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// An update field that was sent must not be blank
fn supplied(field: &str, value: Option<String>) -> TourResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(TourError::Validation(format!(
            "{} cannot be empty",
            field
        ))),
        other => Ok(other),
    }
}

fn tour_not_found(id: &str) -> TourError {
    tracing::debug!("Tour {} not found", id);
    TourError::NotFound("Tour not found".to_string())
}
