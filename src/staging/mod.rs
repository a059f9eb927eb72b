//! Staged image registry
//!
//! Images picked in a wizard are not uploaded right away. They are parked here
//! under a client-visible token (`temp_<uuid>`) and only uploaded when the
//! wizard is finally submitted, so changing one's mind never leaves an
//! orphaned object in storage.
//!
//! The registry is process-wide and keyed per token. Each token is written
//! once and consumed once. Tokens that are never consumed expire after the
//! configured TTL.

use bytes::Bytes;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::StagingConfig;
use crate::models::TEMP_IMAGE_PREFIX;

/// Crop/transform applied in the editor before upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropMetadata {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation in degrees
    #[serde(default)]
    pub rotation: u16,
}

/// In-memory image payload waiting for upload
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub crop: Option<CropMetadata>,
}

impl StagedImage {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
            crop: None,
        }
    }

    pub fn with_crop(mut self, crop: CropMetadata) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Value is not a staged token
    #[error("Not a staged image token: {0}")]
    NotAToken(String),

    /// Token was already consumed or has expired
    #[error("Staged image not found or expired: {0}")]
    Expired(String),
}

/// Process-wide registry of staged images
pub struct StagedImageStore {
    images: Cache<String, Arc<StagedImage>>,
}

impl std::fmt::Debug for StagedImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedImageStore")
            .field("entry_count", &self.images.entry_count())
            .finish()
    }
}

impl StagedImageStore {
    pub fn new(config: &StagingConfig) -> Self {
        Self::with_capacity_and_ttl(config.max_capacity, Duration::from_secs(config.ttl_seconds))
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let images = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { images }
    }

    /// Park an image and return its token
    pub async fn stage(&self, image: StagedImage) -> String {
        let token = format!("{}{}", TEMP_IMAGE_PREFIX, Uuid::new_v4().simple());
        tracing::debug!(
            token = %token,
            filename = %image.filename,
            size = image.size(),
            "Staged image"
        );
        self.images.insert(token.clone(), Arc::new(image)).await;
        token
    }

    /// Look up a staged image without consuming it
    pub async fn get(&self, token: &str) -> Result<Arc<StagedImage>, StagingError> {
        if !token.starts_with(TEMP_IMAGE_PREFIX) {
            return Err(StagingError::NotAToken(token.to_string()));
        }
        self.images
            .get(token)
            .await
            .ok_or_else(|| StagingError::Expired(token.to_string()))
    }

    /// Drop a token, whether it was uploaded or abandoned
    pub async fn discard(&self, token: &str) {
        if self.images.remove(token).await.is_some() {
            tracing::debug!(token = %token, "Discarded staged image");
        }
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.images.contains_key(token)
    }

    pub fn entry_count(&self) -> u64 {
        self.images.entry_count()
    }
}
