//! Venue list endpoints

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ListResponse, StatusRequest};
use crate::listing::{FilterState, VenueListing};
use crate::models::{Venue, VenueInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_venues))
        .route("/{id}", delete(delete_venue))
        .route("/{id}/status", put(change_status))
}

/// GET /api/v1/venues - List venues
///
/// Query parameters: search, status, type, tag, archived, sort, dir, cursor.
async fn list_venues(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ListResponse<Venue>>, ApiError> {
    let filters = FilterState::<VenueListing>::from_query(raw.as_deref().unwrap_or(""));
    let page = state
        .venue_api
        .list_venues(&filters.to_list_query(state.listing_config.page_size))
        .await
        .map_err(|e| ApiError::list_failed(&e))?;

    Ok(Json(ListResponse::new(page, filters.to_query())))
}

/// DELETE /api/v1/venues/{id}
async fn delete_venue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.venue_api.delete_venue(&id).await.map_err(|e| {
        tracing::warn!(id = %id, error = %e, "Failed to delete venue");
        ApiError::mutation_failed(&e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/venues/{id}/status
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Venue>, ApiError> {
    let status = body.parse()?;
    let venue = state
        .venue_api
        .update_venue(&id, &VenueInput::status_only(status))
        .await
        .map_err(|e| {
            tracing::warn!(id = %id, error = %e, "Failed to change venue status");
            ApiError::mutation_failed(&e)
        })?;

    Ok(Json(venue))
}
