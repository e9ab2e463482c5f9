//! Photo binary storage
//!
//! Uploaded bytes are spooled into the image directory under a temporary
//! name and only moved to their final, id-derived name once the photo record
//! exists. A failed stream therefore never strands a record, and the served
//! path only ever holds complete files.

use std::path::{Path, PathBuf};

use async_graphql::UploadValue;

use crate::db::helpers::new_id;
use crate::error::ApiError;

/// Spooled bytes awaiting their final name
pub struct SpooledUpload {
    path: PathBuf,
}

/// Write-through storage for uploaded photo binaries
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the image directory if it does not exist yet
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Final on-disk path for a photo id
    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.jpg"))
    }

    /// Stream an upload's content to a spool file
    pub async fn spool(&self, upload: UploadValue) -> Result<SpooledUpload, ApiError> {
        let path = self.root.join(format!(".incoming-{}", new_id()));
        let dest = path.clone();
        let mut content = upload.content;

        let bytes = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
            let mut out = std::fs::File::create(&dest)?;
            let bytes = std::io::copy(&mut content, &mut out)?;
            out.sync_all()?;
            Ok(bytes)
        })
        .await
        .map_err(|e| ApiError::Attachment(e.to_string()))?
        .map_err(|e| ApiError::Attachment(e.to_string()))?;

        tracing::debug!(bytes, path = %path.display(), "upload spooled");
        Ok(SpooledUpload { path })
    }

    /// Move spooled bytes to their final name
    pub async fn commit(&self, spooled: SpooledUpload, id: &str) -> Result<PathBuf, ApiError> {
        let dest = self.image_path(id);
        tokio::fs::rename(&spooled.path, &dest)
            .await
            .map_err(|e| ApiError::Attachment(e.to_string()))?;
        Ok(dest)
    }

    /// Remove spooled bytes that will not be committed
    pub async fn discard(&self, spooled: SpooledUpload) {
        if let Err(e) = tokio::fs::remove_file(&spooled.path).await {
            tracing::warn!(error = %e, path = %spooled.path.display(), "failed to remove spool file");
        }
    }
}

impl SpooledUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
