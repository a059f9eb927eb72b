//! Content API gateway
//!
//! The admin service owns no content. Everything it edits lives behind the
//! remote GraphQL API, and images go to object storage through presigned
//! uploads. This module defines those collaborators as traits and provides:
//! - `GraphqlClient`, the production implementation over `reqwest`
//! - `HttpObjectStorage`, which PUTs payloads to presigned destinations
//! - `MemoryBackend`, an in-process implementation for demos and tests

pub mod graphql;
pub mod memory;
mod news;
mod upload;
mod venue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::listing::ListQuery;
use crate::models::{NewsArticle, NewsInput, Page, Venue, VenueInput};
use crate::staging::{CropMetadata, StagedImage};

pub use graphql::GraphqlClient;
pub use memory::{MemoryBackend, Operation};
pub use upload::HttpObjectStorage;

/// Shown when an error carries nothing better to show
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Error types for content API operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("API responded with status {status}")]
    Status { status: u16, body: String },

    /// GraphQL-level errors
    #[error("GraphQL error: {}", .0.join("; "))]
    Graphql(Vec<String>),

    /// Entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Best-effort message for a toast notification
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Graphql(messages) => messages
                .iter()
                .find(|m| !m.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            GatewayError::NotFound(what) => format!("{} no longer exists", what),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// News article operations
#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn list_news(&self, query: &ListQuery) -> Result<Page<NewsArticle>, GatewayError>;

    async fn get_news(&self, id: &str) -> Result<Option<NewsArticle>, GatewayError>;

    async fn create_news(&self, input: &NewsInput) -> Result<NewsArticle, GatewayError>;

    async fn update_news(&self, id: &str, input: &NewsInput) -> Result<NewsArticle, GatewayError>;

    async fn delete_news(&self, id: &str) -> Result<(), GatewayError>;

    /// Delete the stored cover image of an article
    async fn remove_news_image(&self, id: &str) -> Result<(), GatewayError>;
}

/// Venue operations
#[async_trait]
pub trait VenueApi: Send + Sync {
    async fn list_venues(&self, query: &ListQuery) -> Result<Page<Venue>, GatewayError>;

    async fn get_venue(&self, id: &str) -> Result<Option<Venue>, GatewayError>;

    async fn create_venue(&self, input: &VenueInput) -> Result<Venue, GatewayError>;

    async fn update_venue(&self, id: &str, input: &VenueInput) -> Result<Venue, GatewayError>;

    async fn delete_venue(&self, id: &str) -> Result<(), GatewayError>;

    async fn remove_venue_image(&self, id: &str) -> Result<(), GatewayError>;
}

/// Request for a presigned upload destination
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropMetadata>,
}

impl PresignRequest {
    pub fn for_image(image: &StagedImage) -> Self {
        Self {
            filename: image.filename.clone(),
            content_type: image.content_type.clone(),
            size: image.size(),
            crop: image.crop,
        }
    }
}

/// Where to upload, and the permanent key the object will have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub key: String,
}

/// Issues presigned upload destinations
#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn presign_upload(&self, request: &PresignRequest) -> Result<PresignedUpload, GatewayError>;
}

/// Receives binary payloads at presigned destinations
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(
        &self,
        destination: &PresignedUpload,
        image: &StagedImage,
    ) -> Result<(), GatewayError>;
}
