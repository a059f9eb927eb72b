//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - News and venue list views, delete and quick status change
//! - Wizard sessions for both entity kinds, including image staging

pub mod middleware;
pub mod news;
pub mod responses;
pub mod venues;
pub mod wizards;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::wizard::{NewsFlow, VenueFlow};

pub use middleware::{ApiError, AppState};

/// Multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the main API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/news", news::router().merge(wizards::router::<NewsFlow>()))
        .nest("/venues", venues::router().merge(wizards::router::<VenueFlow>()))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let body_limit = (state.upload_config.max_file_size + MULTIPART_OVERHEAD) as usize;

    Router::new()
        .nest("/api/v1", build_api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
