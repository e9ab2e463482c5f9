//! Photo catalog
//!
//! Creation and listing of photo records. Every photo is attributed to the
//! resolved identity of the session that posted it; the store write always
//! completes before the `photo-added` event is published.

use std::sync::Arc;

use async_graphql::UploadValue;
use chrono::{DateTime, Utc};

use crate::db::{CreatePhoto, Database, PhotoRecord, UserRecord};
use crate::error::ApiError;
use crate::services::events::EventBus;
use crate::services::storage::PhotoStorage;

/// Client-supplied photo fields, already lowered from the GraphQL input.
/// The owner is never part of this; attribution comes from the session.
pub struct NewPhoto {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub upload: Option<UploadValue>,
}

pub struct PhotoCatalog {
    db: Database,
    bus: Arc<EventBus>,
    storage: PhotoStorage,
}

impl PhotoCatalog {
    pub fn new(db: Database, bus: Arc<EventBus>, storage: PhotoStorage) -> Self {
        Self { db, bus, storage }
    }

    /// Create a photo owned by `identity`, streaming any attached binary to
    /// the image directory.
    ///
    /// Bytes are spooled before the record is inserted, so a failed stream
    /// never leaves a record referencing missing data. The residual failure
    /// window (the final rename) compensates by deleting the record and
    /// surfaces as a distinct attachment error.
    pub async fn post_photo(
        &self,
        input: NewPhoto,
        identity: Option<&UserRecord>,
    ) -> Result<PhotoRecord, ApiError> {
        let Some(owner) = identity else {
            return Err(ApiError::Unauthenticated);
        };

        let spooled = match input.upload {
            Some(upload) => Some(self.storage.spool(upload).await?),
            None => None,
        };

        let created = self
            .db
            .photos()
            .create(CreatePhoto {
                name: input.name,
                description: input.description,
                category: input.category,
                posted_by: owner.github_login.clone(),
                created: Utc::now(),
            })
            .await;

        let record = match created {
            Ok(record) => record,
            Err(e) => {
                if let Some(spooled) = spooled {
                    self.storage.discard(spooled).await;
                }
                return Err(e.into());
            }
        };

        if let Some(spooled) = spooled
            && let Err(e) = self.storage.commit(spooled, &record.id).await
        {
            // A record must not outlive its missing bytes
            let _ = self.db.photos().delete(&record.id).await;
            return Err(e);
        }

        tracing::info!(id = %record.id, posted_by = %record.posted_by, "photo posted");
        self.bus.photo_added.publish(record.clone());

        Ok(record)
    }

    /// Photos in creation order, restricted to those created strictly after
    /// `after` when a bound is given
    pub async fn photos_since(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<PhotoRecord>, ApiError> {
        Ok(self.db.photos().list(after).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;
    use crate::db::CreateUser;

    async fn catalog_with_owner() -> (PhotoCatalog, Database, Arc<EventBus>, tempfile::TempDir, UserRecord)
    {
        let db = Database::connect_in_memory().await.unwrap();
        let bus = Arc::new(EventBus::new());
        let tmp = tempfile::tempdir().unwrap();

        let storage = PhotoStorage::new(tmp.path());
        storage.ensure_root().await.unwrap();

        let owner = db
            .users()
            .create(CreateUser {
                github_login: "gPlake".to_string(),
                name: None,
                avatar: None,
                github_token: "token-1".to_string(),
            })
            .await
            .unwrap();

        let catalog = PhotoCatalog::new(db.clone(), bus.clone(), storage);
        (catalog, db, bus, tmp, owner)
    }

    fn upload(dir: &Path, bytes: &[u8]) -> UploadValue {
        let path = dir.join("upload-src.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();

        UploadValue {
            filename: "shot.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            content: std::fs::File::open(&path).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upload_bytes_land_under_the_assigned_id() {
        let (catalog, db, _bus, tmp, owner) = catalog_with_owner().await;

        let record = catalog
            .post_photo(
                NewPhoto {
                    name: "powder".to_string(),
                    description: None,
                    category: "ACTION".to_string(),
                    upload: Some(upload(tmp.path(), b"frame")),
                },
                Some(&owner),
            )
            .await
            .unwrap();

        let stored = std::fs::read(tmp.path().join(format!("{}.jpg", record.id))).unwrap();
        assert_eq!(stored, b"frame");
        assert!(db.photos().get_by_id(&record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unauthenticated_post_is_rejected_before_any_write() {
        let (catalog, db, bus, tmp, _owner) = catalog_with_owner().await;
        let mut rx = bus.photo_added.subscribe();

        let err = catalog
            .post_photo(
                NewPhoto {
                    name: "x".to_string(),
                    description: None,
                    category: "SELFIE".to_string(),
                    upload: Some(upload(tmp.path(), b"frame")),
                },
                None,
            )
            .await
            .unwrap_err();

        assert_matches!(err, ApiError::Unauthenticated);
        assert_eq!(db.photos().count().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_follows_only_successful_writes() {
        let (catalog, _db, bus, _tmp, owner) = catalog_with_owner().await;
        let mut rx = bus.photo_added.subscribe();

        let record = catalog
            .post_photo(
                NewPhoto {
                    name: "sunshine".to_string(),
                    description: Some("enjoying it".to_string()),
                    category: "SELFIE".to_string(),
                    upload: None,
                },
                Some(&owner),
            )
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, record.id);
        assert_eq!(event.posted_by, "gPlake");
    }
}
