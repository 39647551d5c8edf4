//! Photo storage
//!
//! Photos live as flat files in one directory and are referenced by task
//! rows as `/uploads/<name>`, which is also the path they are served under.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::schemas::CompletionPhotos;

/// URL prefix of stored photos
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Named photo field of a completion form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSlot {
    Before,
    After,
    Damage,
}

impl PhotoSlot {
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "photoBefore" => Some(PhotoSlot::Before),
            "photoAfter" => Some(PhotoSlot::After),
            "photoDamage" => Some(PhotoSlot::Damage),
            _ => None,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            PhotoSlot::Before => "photoBefore",
            PhotoSlot::After => "photoAfter",
            PhotoSlot::Damage => "photoDamage",
        }
    }
}

/// A validated photo not yet written to disk
#[derive(Debug, Clone)]
pub struct PendingPhoto {
    pub slot: PhotoSlot,
    extension: &'static str,
    bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: Arc<PathBuf>,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: Arc::new(root.into()),
            max_bytes,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            CONFIG.storage.uploads_dir.clone(),
            CONFIG.storage.max_upload_bytes,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root.as_path()).await?;
        Ok(())
    }

    /// Check type and size of an uploaded file without touching the disk.
    ///
    /// The stored extension comes from the content type alone, never from
    /// the client's file name.
    pub fn validate(
        &self,
        slot: PhotoSlot,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<PendingPhoto> {
        let Some(extension) = content_type.and_then(extension_for) else {
            return Err(AppError::BadRequest(
                "Only image files are allowed".to_string(),
            ));
        };
        if bytes.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "{} exceeds the {} byte upload limit",
                slot.field_name(),
                self.max_bytes
            )));
        }

        Ok(PendingPhoto {
            slot,
            extension,
            bytes,
        })
    }

    /// Write validated photos and return their public paths by slot.
    ///
    /// If any write fails, the files written so far are removed.
    pub async fn persist(&self, photos: Vec<PendingPhoto>) -> Result<CompletionPhotos> {
        let mut stored = CompletionPhotos::default();

        for photo in photos {
            let name = format!("cleaning-{}.{}", uuid::Uuid::new_v4(), photo.extension);
            if let Err(e) = tokio::fs::write(self.root.join(&name), &photo.bytes).await {
                tracing::error!(file = %name, error = %e, "Failed to store photo");
                self.discard(&stored).await;
                return Err(e.into());
            }

            let public = format!("{}{}", PUBLIC_PREFIX, name);
            match photo.slot {
                PhotoSlot::Before => stored.before = Some(public),
                PhotoSlot::After => stored.after = Some(public),
                PhotoSlot::Damage => stored.damage = Some(public),
            }
        }

        Ok(stored)
    }

    /// Remove stored photos, logging instead of failing
    pub async fn discard(&self, photos: &CompletionPhotos) {
        for path in [&photos.before, &photos.after, &photos.damage]
            .into_iter()
            .flatten()
        {
            if let Some(file) = self.resolve(path) {
                if let Err(e) = tokio::fs::remove_file(&file).await {
                    tracing::warn!(path = %path, error = %e, "Failed to remove photo");
                }
            }
        }
    }

    /// Map a `/uploads/<name>` path to a file in the store.
    ///
    /// Returns `None` for anything that is not a single plain file name.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    /// Contents of a stored photo, or `None` when it is missing
    pub async fn read(&self, public_path: &str) -> Result<Option<Vec<u8>>> {
        let Some(file) = self.resolve(public_path) else {
            return Ok(None);
        };
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// File extension for an accepted raster image type
fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/heif" => Some("heif"),
        _ => None,
    }
}
