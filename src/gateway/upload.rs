//! Presigned uploads
//!
//! The content API hands out a destination URL plus the permanent key the
//! object will live under; the payload itself goes straight to object storage.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;

use super::graphql::GraphqlClient;
use super::{GatewayError, ObjectStorage, PresignRequest, PresignedUpload, UploadApi};
use crate::config::BackendConfig;
use crate::staging::StagedImage;

const CREATE_PRESIGNED_UPLOAD: &str = r#"
mutation CreatePresignedUpload($input: PresignedUploadInput!) {
  createPresignedUpload(input: $input) { uploadUrl key }
}
"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresignData {
    create_presigned_upload: PresignedUpload,
}

#[async_trait]
impl UploadApi for GraphqlClient {
    async fn presign_upload(&self, request: &PresignRequest) -> Result<PresignedUpload, GatewayError> {
        let data: PresignData = self
            .execute(
                "CreatePresignedUpload",
                CREATE_PRESIGNED_UPLOAD,
                json!({ "input": request }),
            )
            .await?;
        Ok(data.create_presigned_upload)
    }
}

/// Object storage reached through presigned URLs
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    http: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http })
    }

    /// Share the connection pool of an existing client
    pub fn from_client(client: &GraphqlClient) -> Self {
        Self {
            http: client.http().clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put_object(
        &self,
        destination: &PresignedUpload,
        image: &StagedImage,
    ) -> Result<(), GatewayError> {
        let response = self
            .http
            .put(&destination.upload_url)
            .header(CONTENT_TYPE, image.content_type.as_str())
            .body(image.data.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(key = %destination.key, status = status.as_u16(), "Object upload rejected");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(key = %destination.key, size = image.size(), "Uploaded image");
        Ok(())
    }
}
