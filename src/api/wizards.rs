//! Wizard session endpoints
//!
//! The same routes are mounted under `/news` and `/venues`; the entity kind is
//! picked by the [`WizardRoutes`] implementation the router is built for.
//! Requests that change a session fail with `CONFLICT` while another change
//! on the same session is still running.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::StatusRequest;
use crate::config::UploadConfig;
use crate::staging::{CropMetadata, StagedImage};
use crate::wizard::{
    NewsFlow, Outcome, Step, VenueFlow, Wizard, WizardFlow, WizardRegistry, WizardView,
};

/// Ties a wizard flow to its registry in [`AppState`]
pub trait WizardRoutes: WizardFlow + Sized {
    fn registry(state: &AppState) -> &Arc<WizardRegistry<Self>>;

    fn flow(state: &AppState) -> Self;
}

impl WizardRoutes for NewsFlow {
    fn registry(state: &AppState) -> &Arc<WizardRegistry<Self>> {
        &state.news_wizards
    }

    fn flow(state: &AppState) -> Self {
        NewsFlow::new(state.news_api.clone())
    }
}

impl WizardRoutes for VenueFlow {
    fn registry(state: &AppState) -> &Arc<WizardRegistry<Self>> {
        &state.venue_wizards
    }

    fn flow(state: &AppState) -> Self {
        VenueFlow::new(state.venue_api.clone())
    }
}

/// Session snapshot returned by every wizard endpoint
#[derive(Debug, Serialize)]
pub struct SessionResponse<E, D> {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub view: WizardView<E, D>,
    /// Set once a create flow completes; the session is gone afterwards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Token of a freshly staged image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

type SessionJson<F> =
    Json<SessionResponse<<F as WizardFlow>::Entity, <F as WizardFlow>::Draft>>;

fn respond<F: WizardFlow>(session_id: Uuid, wizard: &Wizard<F>) -> SessionJson<F> {
    Json(SessionResponse {
        session_id,
        view: wizard.view(),
        redirect: None,
        token: None,
    })
}

pub fn router<F: WizardRoutes>() -> Router<AppState> {
    Router::new()
        .route("/wizards", post(open_create::<F>))
        .route("/{id}/wizards", post(open_edit::<F>))
        .route("/wizards/{sid}", get(show::<F>).delete(discard::<F>))
        .route("/wizards/{sid}/steps/{n}", patch(apply::<F>))
        .route("/wizards/{sid}/steps/{n}/open", post(open_step::<F>))
        .route("/wizards/{sid}/submit", post(submit::<F>))
        .route("/wizards/{sid}/update", post(update::<F>))
        .route("/wizards/{sid}/back", post(back::<F>))
        .route("/wizards/{sid}/status", put(set_status::<F>))
        .route(
            "/wizards/{sid}/image",
            post(stage_image::<F>).delete(remove_image::<F>),
        )
}

fn parse_step(n: u8) -> Result<Step, ApiError> {
    Step::from_number(n).ok_or_else(|| ApiError::validation_error(format!("Unknown step: {}", n)))
}

/// POST /{kind}/wizards - Open a create-mode session
async fn open_create<F: WizardRoutes>(
    State(state): State<AppState>,
) -> Result<(StatusCode, SessionJson<F>), ApiError> {
    let wizard = Wizard::create(
        F::flow(&state),
        state.resolver.clone(),
        state.wizard_config.placeholder_image.clone(),
    );
    let registry = F::registry(&state);
    let session_id = registry.insert(wizard).await;
    let wizard = registry.lock(session_id).await?;
    Ok((StatusCode::CREATED, respond(session_id, &wizard)))
}

/// POST /{kind}/{id}/wizards - Open an edit-mode session seeded from the entity
async fn open_edit<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, SessionJson<F>), ApiError> {
    let flow = F::flow(&state);
    let entity = flow
        .fetch(&id)
        .await
        .map_err(|e| ApiError::list_failed(&e))?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", F::KIND, id)))?;

    let wizard = Wizard::edit(flow, state.resolver.clone(), entity);
    let registry = F::registry(&state);
    let session_id = registry.insert(wizard).await;
    let wizard = registry.lock(session_id).await?;
    Ok((StatusCode::CREATED, respond(session_id, &wizard)))
}

/// GET /{kind}/wizards/{sid}
async fn show<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<SessionJson<F>, ApiError> {
    let wizard = F::registry(&state).lock(sid).await?;
    Ok(respond(sid, &wizard))
}

/// PATCH /{kind}/wizards/{sid}/steps/{n} - Edit fields of a step
async fn apply<F: WizardRoutes>(
    State(state): State<AppState>,
    Path((sid, n)): Path<(Uuid, u8)>,
    Json(patch): Json<F::Draft>,
) -> Result<SessionJson<F>, ApiError> {
    let step = parse_step(n)?;
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.apply(step, patch);
    Ok(respond(sid, &wizard))
}

/// POST /{kind}/wizards/{sid}/steps/{n}/open - Navigate to a step
async fn open_step<F: WizardRoutes>(
    State(state): State<AppState>,
    Path((sid, n)): Path<(Uuid, u8)>,
) -> Result<SessionJson<F>, ApiError> {
    let step = parse_step(n)?;
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.open(step)?;
    Ok(respond(sid, &wizard))
}

/// POST /{kind}/wizards/{sid}/submit - Submit the current step
///
/// A completed create flow answers with the redirect target and closes the
/// session.
async fn submit<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<SessionJson<F>, ApiError> {
    let registry = F::registry(&state);
    let (response, finished) = {
        let mut wizard = registry.try_lock(sid).await?;
        let outcome = wizard.submit().await?;
        let Json(mut body) = respond(sid, &wizard);
        if let Outcome::Completed {
            redirect: Some(redirect),
            ..
        } = outcome
        {
            body.redirect = Some(redirect);
        }
        let finished = body.redirect.is_some();
        (body, finished)
    };

    if finished {
        registry.remove(sid).await;
    }
    Ok(Json(response))
}

/// POST /{kind}/wizards/{sid}/update - Edit mode: persist the current step now
async fn update<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<SessionJson<F>, ApiError> {
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.update().await?;
    Ok(respond(sid, &wizard))
}

/// POST /{kind}/wizards/{sid}/back
async fn back<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<SessionJson<F>, ApiError> {
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.back();
    Ok(respond(sid, &wizard))
}

/// PUT /{kind}/wizards/{sid}/status - Status toggle, sent with the next save
async fn set_status<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<SessionJson<F>, ApiError> {
    let status = body.parse()?;
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.set_status(status);
    Ok(respond(sid, &wizard))
}

/// POST /{kind}/wizards/{sid}/image - Stage an image for the final save
///
/// Accepts multipart/form-data with a file field named "file" and optional
/// crop fields "x", "y", "width", "height" and "rotation".
async fn stage_image<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    multipart: Multipart,
) -> Result<SessionJson<F>, ApiError> {
    let image = read_image(multipart, &state.upload_config).await?;
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    let token = wizard.stage_image(image).await;

    let Json(mut body) = respond(sid, &wizard);
    body.token = Some(token);
    Ok(Json(body))
}

/// DELETE /{kind}/wizards/{sid}/image - Cancel a staged image or mark the
/// stored one for removal
async fn remove_image<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<SessionJson<F>, ApiError> {
    let mut wizard = F::registry(&state).try_lock(sid).await?;
    wizard.remove_image().await;
    Ok(respond(sid, &wizard))
}

/// DELETE /{kind}/wizards/{sid} - Throw the session away
async fn discard<F: WizardRoutes>(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let session = F::registry(&state)
        .remove(sid)
        .await
        .ok_or_else(|| ApiError::not_found("Wizard session not found or expired"))?;
    session.lock().await.discard().await;
    tracing::debug!(kind = F::KIND, session = %sid, "Discarded wizard session");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Default)]
struct CropFields {
    x: Option<u32>,
    y: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    rotation: Option<u16>,
}

impl CropFields {
    /// A crop needs at least its size; the offset defaults to the origin
    fn into_metadata(self) -> Option<CropMetadata> {
        Some(CropMetadata {
            x: self.x.unwrap_or(0),
            y: self.y.unwrap_or(0),
            width: self.width?,
            height: self.height?,
            rotation: self.rotation.unwrap_or(0),
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation_error(format!("Invalid value for {}: {}", name, raw)))
}

async fn read_image(mut multipart: Multipart, config: &UploadConfig) -> Result<StagedImage, ApiError> {
    let mut image = None;
    let mut crop = CropFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !config.is_type_allowed(&content_type) {
                    return Err(ApiError::validation_error(format!(
                        "Invalid file type: {}. Allowed types: {:?}",
                        content_type, config.allowed_types
                    )));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

                if data.len() as u64 > config.max_file_size {
                    return Err(ApiError::validation_error(format!(
                        "File too large. Maximum size: {} bytes ({} MB)",
                        config.max_file_size,
                        config.max_file_size / 1024 / 1024
                    )));
                }
                if data.is_empty() {
                    return Err(ApiError::validation_error("Empty file"));
                }

                image = Some(StagedImage::new(filename, content_type, data));
            }
            "x" | "y" | "width" | "height" | "rotation" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation_error(format!("Failed to read {}: {}", name, e)))?;
                match name.as_str() {
                    "x" => crop.x = Some(parse_number(&name, &raw)?),
                    "y" => crop.y = Some(parse_number(&name, &raw)?),
                    "width" => crop.width = Some(parse_number(&name, &raw)?),
                    "height" => crop.height = Some(parse_number(&name, &raw)?),
                    _ => crop.rotation = Some(parse_number::<u16>(&name, &raw)? % 360),
                }
            }
            _ => continue,
        }
    }

    let image = image.ok_or_else(|| ApiError::validation_error("No file provided"))?;
    Ok(match crop.into_metadata() {
        Some(crop) => image.with_crop(crop),
        None => image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_needs_size() {
        let partial = CropFields {
            x: Some(4),
            width: Some(100),
            ..CropFields::default()
        };
        assert!(partial.into_metadata().is_none());

        let full = CropFields {
            width: Some(100),
            height: Some(50),
            rotation: Some(90),
            ..CropFields::default()
        };
        assert_eq!(
            full.into_metadata(),
            Some(CropMetadata {
                x: 0,
                y: 0,
                width: 100,
                height: 50,
                rotation: 90,
            })
        );
    }

    #[test]
    fn test_parse_step_rejects_unknown() {
        assert_eq!(parse_step(2).unwrap(), Step::Two);
        assert_eq!(parse_step(3).unwrap_err().error.code, "VALIDATION_ERROR");
    }
}
