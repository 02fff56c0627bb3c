/// SQLite-backed tour repository
use crate::{
    error::TourResult,
    tour_store::{NewTour, Tour, TourPatch, TourRepository, TourRow, TourUpdate},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

const SELECT_TOUR: &str = r#"
    SELECT id, state, description, places, images, created_at, updated_at
    FROM tour
"#;

/// Tour repository over a SQLite pool
#[derive(Clone)]
pub struct SqliteTourRepository {
    db: SqlitePool,
}

impl SqliteTourRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TourRepository for SqliteTourRepository {
    async fn create(&self, new_tour: NewTour) -> TourResult<Tour> {
        let now = Utc::now();
        let tour = Tour {
            id: Uuid::new_v4().to_string(),
            state: new_tour.state,
            description: new_tour.description,
            places: new_tour.places,
            images: new_tour.images,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tour (id, state, description, places, images, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&tour.id)
        .bind(&tour.state)
        .bind(&tour.description)
        .bind(&tour.places)
        .bind(serde_json::to_string(&tour.images)?)
        .bind(tour.created_at)
        .bind(tour.updated_at)
        .execute(&self.db)
        .await?;

        Ok(tour)
    }

    async fn find_all(&self) -> TourResult<Vec<Tour>> {
        let rows: Vec<TourRow> = sqlx::query_as(&format!("{} ORDER BY seq ASC", SELECT_TOUR))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(Tour::try_from).collect()
    }

    async fn find_by_id(&self, id: &str) -> TourResult<Option<Tour>> {
        let row: Option<TourRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_TOUR))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Tour::try_from).transpose()
    }

    async fn update_by_id(&self, id: &str, patch: TourPatch) -> TourResult<Option<TourUpdate>> {
        // Take the write lock before reading; a deferred transaction that
        // later upgrades fails with SQLITE_BUSY under concurrent writers.
        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await?;

        let row: Option<TourRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_TOUR))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        // Dropping the transaction rolls it back
        let Some(row) = row else {
            return Ok(None);
        };

        let previous = Tour::try_from(row)?;
        if patch.is_empty() {
            return Ok(Some(TourUpdate {
                tour: previous,
                replaced_images: Vec::new(),
            }));
        }

        let mut tour = previous.clone();
        patch.apply(&mut tour);
        tour.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE tour
            SET state = ?1,
                description = ?2,
                places = ?3,
                images = ?4,
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&tour.state)
        .bind(&tour.description)
        .bind(&tour.places)
        .bind(serde_json::to_string(&tour.images)?)
        .bind(tour.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let kept: HashSet<&String> = tour.images.iter().collect();
        let replaced_images = previous
            .images
            .iter()
            .filter(|image| !kept.contains(image))
            .cloned()
            .collect();

        Ok(Some(TourUpdate {
            tour,
            replaced_images,
        }))
    }

    async fn delete_by_id(&self, id: &str) -> TourResult<Option<Tour>> {
        let row: Option<TourRow> = sqlx::query_as(
            r#"
            DELETE FROM tour
            WHERE id = ?1
            RETURNING id, state, description, places, images, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Tour::try_from).transpose()
    }

    async fn referenced_images(&self) -> TourResult<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT images FROM tour")
            .fetch_all(&self.db)
            .await?;

        let mut images = HashSet::new();
        for (json,) in rows {
            let urls: Vec<String> = serde_json::from_str(&json)?;
            images.extend(urls);
        }
        Ok(images)
    }
}
