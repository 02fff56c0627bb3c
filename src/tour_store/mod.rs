/// Tour Store - persistent tour records
///
/// The repository trait is the seam between the service and the database,
/// so the service can run against SQLite or a test double.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::SqliteTourRepository;

use crate::error::TourResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// Persistent store of tour records
///
/// Every operation is atomic on its own; callers composing several calls
/// get no cross-call isolation.
#[async_trait]
pub trait TourRepository: Send + Sync {
    /// Insert a new tour, assigning its id and timestamps
    async fn create(&self, tour: NewTour) -> TourResult<Tour>;

    /// All tours in insertion order
    async fn find_all(&self) -> TourResult<Vec<Tour>>;

    async fn find_by_id(&self, id: &str) -> TourResult<Option<Tour>>;

    /// Merge `patch` into the stored tour; `None` when the id is unknown
    async fn update_by_id(&self, id: &str, patch: TourPatch) -> TourResult<Option<TourUpdate>>;

    /// Remove a tour, returning the deleted record
    async fn delete_by_id(&self, id: &str) -> TourResult<Option<Tour>>;

    /// Every image URL referenced by any tour
    async fn referenced_images(&self) -> TourResult<HashSet<String>>;
}
