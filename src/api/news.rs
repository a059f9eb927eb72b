//! News article list endpoints
//!
//! Wizard sessions for articles are mounted next to these, see
//! [`crate::api::wizards`].

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ListResponse, StatusRequest};
use crate::listing::{FilterState, NewsListing};
use crate::models::{NewsArticle, NewsInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news))
        .route("/{id}", delete(delete_news))
        .route("/{id}/status", put(change_status))
}

/// GET /api/v1/news - List articles
///
/// Query parameters: search, status, category, tag, archived, sort, dir, cursor.
/// Unknown or invalid values fall back to their defaults.
async fn list_news(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ListResponse<NewsArticle>>, ApiError> {
    let filters = FilterState::<NewsListing>::from_query(raw.as_deref().unwrap_or(""));
    let page = state
        .news_api
        .list_news(&filters.to_list_query(state.listing_config.page_size))
        .await
        .map_err(|e| ApiError::list_failed(&e))?;

    Ok(Json(ListResponse::new(page, filters.to_query())))
}

/// DELETE /api/v1/news/{id} - Delete an article
async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.news_api.delete_news(&id).await.map_err(|e| {
        tracing::warn!(id = %id, error = %e, "Failed to delete news article");
        ApiError::mutation_failed(&e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/news/{id}/status - Quick status change from the list
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<NewsArticle>, ApiError> {
    let status = body.parse()?;
    let article = state
        .news_api
        .update_news(&id, &NewsInput::status_only(status))
        .await
        .map_err(|e| {
            tracing::warn!(id = %id, error = %e, "Failed to change news status");
            ApiError::mutation_failed(&e)
        })?;

    Ok(Json(article))
}
