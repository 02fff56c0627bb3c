/// Tour data models
use crate::error::{TourError, TourResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tour record as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub state: String,
    pub description: String,
    pub places: String,
    /// Public URLs of the tour's images, in upload order
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a tour about to be created
#[derive(Debug, Clone)]
pub struct NewTour {
    pub state: String,
    pub description: String,
    pub places: String,
    pub images: Vec<String>,
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct TourPatch {
    pub state: Option<String>,
    pub description: Option<String>,
    pub places: Option<String>,
    /// Replaces the whole image list when present
    pub images: Option<Vec<String>>,
}

impl TourPatch {
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.description.is_none()
            && self.places.is_none()
            && self.images.is_none()
    }

    /// Apply the patch to a tour in place
    pub fn apply(self, tour: &mut Tour) {
        if let Some(state) = self.state {
            tour.state = state;
        }
        if let Some(description) = self.description {
            tour.description = description;
        }
        if let Some(places) = self.places {
            tour.places = places;
        }
        if let Some(images) = self.images {
            tour.images = images;
        }
    }
}

/// Result of a committed update
#[derive(Debug, Clone)]
pub struct TourUpdate {
    pub tour: Tour,
    /// Image URLs the tour referenced before and no longer does
    pub replaced_images: Vec<String>,
}

/// Row shape of the `tour` table
#[derive(Debug, Clone, FromRow)]
pub struct TourRow {
    pub id: String,
    pub state: String,
    pub description: String,
    pub places: String,
    pub images: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TourRow> for Tour {
    type Error = TourError;

    fn try_from(row: TourRow) -> TourResult<Self> {
        let images: Vec<String> = serde_json::from_str(&row.images)?;

        Ok(Tour {
            id: row.id,
            state: row.state,
            description: row.description,
            places: row.places,
            images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
