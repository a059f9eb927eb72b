//! Shared API state and error responses
//!
//! Every handler returns `Result<_, ApiError>`. Errors render as
//! `{"error": {"code", "message", "details"}}` and the status code follows from
//! the error code, in one place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ListingConfig, UploadConfig, WizardConfig};
use crate::gateway::{GatewayError, NewsApi, ObjectStorage, UploadApi, VenueApi, GENERIC_ERROR_MESSAGE};
use crate::staging::StagedImageStore;
use crate::wizard::{ImageResolver, NewsFlow, RegistryError, ResolveError, VenueFlow, WizardError, WizardRegistry};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub news_api: Arc<dyn NewsApi>,
    pub venue_api: Arc<dyn VenueApi>,
    pub resolver: ImageResolver,
    pub news_wizards: Arc<WizardRegistry<NewsFlow>>,
    pub venue_wizards: Arc<WizardRegistry<VenueFlow>>,
    pub upload_config: Arc<UploadConfig>,
    pub wizard_config: Arc<WizardConfig>,
    pub listing_config: Arc<ListingConfig>,
}

impl AppState {
    pub fn new(
        config: &Config,
        news_api: Arc<dyn NewsApi>,
        venue_api: Arc<dyn VenueApi>,
        uploads: Arc<dyn UploadApi>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let store = Arc::new(StagedImageStore::new(&config.staging));
        let idle = Duration::from_secs(config.wizard.session_idle_seconds);
        Self {
            news_api,
            venue_api,
            resolver: ImageResolver::new(store, uploads, storage),
            news_wizards: Arc::new(WizardRegistry::new(idle)),
            venue_wizards: Arc::new(WizardRegistry::new(idle)),
            upload_config: Arc::new(config.upload.clone()),
            wizard_config: Arc::new(config.wizard.clone()),
            listing_config: Arc::new(config.listing.clone()),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// A failed create/update/delete against the content API
    pub fn mutation_failed(err: &GatewayError) -> Self {
        match err {
            GatewayError::NotFound(_) => Self::not_found(err.user_message()),
            _ => Self::new("MUTATION_FAILED", err.user_message()),
        }
    }

    /// A failed read; the client may offer a retry
    pub fn list_failed(err: &GatewayError) -> Self {
        tracing::warn!(error = %err, "Content query failed");
        Self::with_details(
            "LIST_FAILED",
            GENERIC_ERROR_MESSAGE,
            json!({ "retryable": true }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "UPLOAD_FAILED" | "MUTATION_FAILED" | "LIST_FAILED" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::not_found(err.to_string()),
            RegistryError::Busy => Self::conflict(err.to_string()),
        }
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match &err {
            WizardError::Validation(fields) => Self::with_details(
                "VALIDATION_ERROR",
                err.user_message(),
                json!({ "fields": fields }),
            ),
            WizardError::Image(ResolveError::NoEntity) => Self::conflict(err.user_message()),
            WizardError::Image(_) => Self::new("UPLOAD_FAILED", err.user_message()),
            WizardError::Mutation(e) => Self::mutation_failed(e),
            WizardError::StepUnavailable(_) | WizardError::NotEditing => {
                Self::conflict(err.user_message())
            }
        }
    }
}
