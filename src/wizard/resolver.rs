//! Staged-image resolution
//!
//! Runs once per final submission, before the entity mutation. Every image
//! field value falls into exactly one branch:
//! - marked for removal: delete the stored image, submit an empty value
//! - staged token: presign, upload the payload, submit the permanent key
//! - anything else: submit unchanged
//!
//! The only way to put an image into a mutation input is a [`ResolvedImage`],
//! and only this module can build one.

use async_trait::async_trait;
use std::sync::Arc;

use crate::gateway::{GatewayError, ObjectStorage, PresignRequest, UploadApi};
use crate::models::ImageValue;
use crate::staging::{StagedImageStore, StagingError};

/// Deletes the stored image of an existing entity
#[async_trait]
pub trait ImageRemover: Send + Sync {
    async fn remove_image(&self, entity_id: &str) -> Result<(), GatewayError>;
}

/// Which branch produced a [`ResolvedImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Removed,
    Uploaded,
    Unchanged,
}

/// Image value that is safe to send to a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    key: String,
    resolution: Resolution,
}

impl ResolvedImage {
    /// Permanent storage key, or empty for "no image"
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Draft value equivalent to what was submitted
    pub fn to_image_value(&self) -> ImageValue {
        if self.key.is_empty() {
            ImageValue::Empty
        } else {
            ImageValue::Stored(self.key.clone())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("The image can only be removed once the entity exists")]
    NoEntity,

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Image upload failed: {0}")]
    Upload(#[source] GatewayError),

    #[error("Image removal failed: {0}")]
    Removal(#[source] GatewayError),
}

impl ResolveError {
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Staging(_) => {
                "The selected image is no longer available. Please choose it again.".to_string()
            }
            ResolveError::Upload(e) | ResolveError::Removal(e) => e.user_message(),
            ResolveError::NoEntity => self.to_string(),
        }
    }
}

/// Turns image field values into mutation-safe values
#[derive(Clone)]
pub struct ImageResolver {
    store: Arc<StagedImageStore>,
    uploads: Arc<dyn UploadApi>,
    storage: Arc<dyn ObjectStorage>,
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ImageResolver {
    pub fn new(
        store: Arc<StagedImageStore>,
        uploads: Arc<dyn UploadApi>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            store,
            uploads,
            storage,
        }
    }

    pub fn store(&self) -> &Arc<StagedImageStore> {
        &self.store
    }

    /// Resolve a field value. `None` means the field is not part of the
    /// submission and stays out of the payload.
    pub async fn resolve(
        &self,
        value: Option<&ImageValue>,
        entity_id: Option<&str>,
        remover: &dyn ImageRemover,
    ) -> Result<Option<ResolvedImage>, ResolveError> {
        let Some(value) = value else {
            return Ok(None);
        };

        let resolved = match value {
            ImageValue::MarkedForRemoval => {
                let id = entity_id.ok_or(ResolveError::NoEntity)?;
                remover.remove_image(id).await.map_err(|e| {
                    tracing::warn!(entity = %id, error = %e, "Image removal failed");
                    ResolveError::Removal(e)
                })?;
                tracing::info!(entity = %id, "Removed stored image");
                ResolvedImage {
                    key: String::new(),
                    resolution: Resolution::Removed,
                }
            }
            ImageValue::Staged(token) => ResolvedImage {
                key: self.upload(token).await?,
                resolution: Resolution::Uploaded,
            },
            ImageValue::Stored(key) => ResolvedImage {
                key: key.clone(),
                resolution: Resolution::Unchanged,
            },
            ImageValue::Empty => ResolvedImage {
                key: String::new(),
                resolution: Resolution::Unchanged,
            },
        };
        Ok(Some(resolved))
    }

    /// Upload a staged payload; the token is dropped only once the upload
    /// went through, so a failed attempt can be retried.
    async fn upload(&self, token: &str) -> Result<String, ResolveError> {
        let image = self.store.get(token).await?;
        let destination = self
            .uploads
            .presign_upload(&PresignRequest::for_image(&image))
            .await
            .map_err(|e| {
                tracing::warn!(token = %token, error = %e, "Presign request failed");
                ResolveError::Upload(e)
            })?;
        self.storage
            .put_object(&destination, &image)
            .await
            .map_err(|e| {
                tracing::warn!(token = %token, error = %e, "Staged image upload failed");
                ResolveError::Upload(e)
            })?;
        self.store.discard(token).await;
        tracing::info!(token = %token, key = %destination.key, "Resolved staged image");
        Ok(destination.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StagingConfig;
    use crate::gateway::{MemoryBackend, Operation};
    use crate::models::TEMP_IMAGE_PREFIX;
    use crate::staging::StagedImage;
    use bytes::Bytes;
    use proptest::prelude::*;

    struct Remover(Arc<MemoryBackend>);

    #[async_trait]
    impl ImageRemover for Remover {
        async fn remove_image(&self, entity_id: &str) -> Result<(), GatewayError> {
            use crate::gateway::NewsApi;
            self.0.remove_news_image(entity_id).await
        }
    }

    fn setup() -> (ImageResolver, Arc<MemoryBackend>, Remover) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(StagedImageStore::new(&StagingConfig::default()));
        let resolver = ImageResolver::new(store, backend.clone(), backend.clone());
        (resolver, backend.clone(), Remover(backend))
    }

    async fn stage(resolver: &ImageResolver) -> String {
        resolver
            .store()
            .stage(StagedImage::new("cover.jpg", "image/jpeg", Bytes::from_static(b"jpeg")))
            .await
    }

    #[tokio::test]
    async fn test_staged_token_is_uploaded_and_consumed() {
        let (resolver, backend, remover) = setup();
        let token = stage(&resolver).await;

        let resolved = resolver
            .resolve(Some(&ImageValue::Staged(token.clone())), Some("news-1"), &remover)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.resolution(), Resolution::Uploaded);
        assert!(resolved.key().starts_with("uploads/"));
        assert!(backend.object(resolved.key()).await.is_some());
        assert!(!resolver.store().contains(&token).await);
        assert!(backend.calls_of(Operation::RemoveNewsImage).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_token_for_retry() {
        let (resolver, backend, remover) = setup();
        let token = stage(&resolver).await;
        let value = ImageValue::Staged(token.clone());
        backend.fail_next(Operation::PutObject).await;

        let err = resolver.resolve(Some(&value), None, &remover).await.unwrap_err();
        assert!(matches!(err, ResolveError::Upload(_)));
        assert!(resolver.store().contains(&token).await);

        let resolved = resolver.resolve(Some(&value), None, &remover).await.unwrap();
        assert_eq!(resolved.map(|r| r.resolution()), Some(Resolution::Uploaded));
    }

    #[tokio::test]
    async fn test_removal_calls_remover_not_upload() {
        let (resolver, backend, remover) = setup();
        let article = {
            use crate::gateway::NewsApi;
            use crate::models::NewsInput;
            backend
                .create_news(&NewsInput {
                    title: Some("Has image".to_string()),
                    image: Some("news/old.png".to_string()),
                    ..NewsInput::default()
                })
                .await
                .unwrap()
        };

        let resolved = resolver
            .resolve(Some(&ImageValue::MarkedForRemoval), Some(&article.id), &remover)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.resolution(), Resolution::Removed);
        assert_eq!(resolved.key(), "");
        assert_eq!(backend.calls_of(Operation::RemoveNewsImage).await.len(), 1);
        assert!(backend.calls_of(Operation::Presign).await.is_empty());
    }

    #[tokio::test]
    async fn test_removal_needs_entity() {
        let (resolver, _, remover) = setup();
        let err = resolver
            .resolve(Some(&ImageValue::MarkedForRemoval), None, &remover)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoEntity));
    }

    #[tokio::test]
    async fn test_unknown_token_is_a_staging_error() {
        let (resolver, backend, remover) = setup();
        let err = resolver
            .resolve(Some(&ImageValue::parse("temp_abc123")), Some("news-1"), &remover)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Staging(StagingError::Expired(_))));
        assert!(backend.calls_of(Operation::Presign).await.is_empty());
    }

    #[tokio::test]
    async fn test_stored_and_absent_values_pass_through() {
        let (resolver, backend, remover) = setup();
        let stored = resolver
            .resolve(Some(&ImageValue::parse("news/a.png")), None, &remover)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.key(), "news/a.png");
        assert_eq!(stored.resolution(), Resolution::Unchanged);
        assert!(resolver.resolve(None, None, &remover).await.unwrap().is_none());
        assert!(backend.calls().await.is_empty());
    }

    proptest! {
        /// No branch ever hands a staged token to the mutation payload.
        #[test]
        fn resolved_key_is_never_a_token(raw in prop_oneof![
            Just(String::new()),
            Just("REMOVE".to_string()),
            "[a-z]{1,8}/[a-z]{1,8}\\.png",
            Just("staged".to_string()),
        ]) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let (resolver, backend, remover) = setup();
                let article = {
                    use crate::gateway::NewsApi;
                    use crate::models::NewsInput;
                    backend
                        .create_news(&NewsInput {
                            title: Some("Entity".to_string()),
                            ..NewsInput::default()
                        })
                        .await
                        .unwrap()
                };
                let raw = if raw == "staged" { stage(&resolver).await } else { raw };
                let value = ImageValue::parse(&raw);

                let resolved = resolver
                    .resolve(Some(&value), Some(&article.id), &remover)
                    .await
                    .unwrap()
                    .unwrap();
                assert!(!resolved.key().starts_with(TEMP_IMAGE_PREFIX));
                match value {
                    ImageValue::Staged(_) => assert_eq!(resolved.resolution(), Resolution::Uploaded),
                    ImageValue::MarkedForRemoval => assert_eq!(resolved.key(), ""),
                    _ => assert_eq!(resolved.key(), raw),
                }
            });
        }
    }
}
