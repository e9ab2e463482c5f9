//! Photos repository
//!
//! Photo records are immutable once created. The owning user is referenced by
//! github login; resolving it is a follow-up lookup, not a stored reference.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool as Pool;

use super::helpers::{datetime_to_str, new_id};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub posted_by: String,
    pub created: String,
}

#[derive(Debug, Clone)]
pub struct CreatePhoto {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub posted_by: String,
    pub created: DateTime<Utc>,
}

type PhotoRow = (String, String, Option<String>, String, String, String);

const PHOTO_COLUMNS: &str = "id, name, description, category, posted_by, created";

fn row_to_record(r: PhotoRow) -> PhotoRecord {
    PhotoRecord {
        id: r.0,
        name: r.1,
        description: r.2,
        category: r.3,
        posted_by: r.4,
        created: r.5,
    }
}

pub struct PhotosRepository {
    pool: Pool,
}

impl PhotosRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new photo and read the stored record back
    pub async fn create(&self, photo: CreatePhoto) -> Result<PhotoRecord> {
        let id = new_id();
        let created = datetime_to_str(photo.created);

        sqlx::query(
            r#"
            INSERT INTO photos (id, name, description, category, posted_by, created)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&photo.name)
        .bind(&photo.description)
        .bind(&photo.category)
        .bind(&photo.posted_by)
        .bind(&created)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create photo"))
    }

    /// Get photo by id
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PhotoRecord>> {
        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    /// All photos ordered by creation time ascending, optionally restricted
    /// to those created strictly after `after`.
    ///
    /// ISO-8601 strings in UTC compare lexicographically in timestamp order,
    /// so the bound is applied directly in SQL.
    pub async fn list(&self, after: Option<DateTime<Utc>>) -> Result<Vec<PhotoRecord>> {
        let rows = match after {
            Some(bound) => {
                sqlx::query_as::<_, PhotoRow>(&format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos WHERE created > ? ORDER BY created"
                ))
                .bind(datetime_to_str(bound))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PhotoRow>(&format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos ORDER BY created"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// All photos posted by the given login, ordered by creation time
    pub async fn list_by_login(&self, login: &str) -> Result<Vec<PhotoRecord>> {
        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE posted_by = ? ORDER BY created"
        ))
        .bind(login)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Delete a photo by id. Not part of the public API surface; used to
    /// compensate when the binary write-through fails after the insert.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count photos
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM photos")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
