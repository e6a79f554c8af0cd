//! Registration API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, respond, success, ApiResult};
use crate::models::{CreateRegistrationRequest, Registration};
use crate::validation::{require, validate_academic_year, validate_email};
use crate::AppState;

/// POST /api/registrations - Public registration form.
pub async fn submit_registration(
    State(state): State<AppState>,
    Json(request): Json<CreateRegistrationRequest>,
) -> ApiResult<Registration> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let checked = require("Name", &request.name)
        .and_then(|_| validate_email(&request.email))
        .and_then(|_| validate_academic_year(request.academic_year));
    if let Err(e) = checked {
        return error(e.into(), revision_id);
    }

    let result = state.repo.create_registration(&request).await;
    if let Ok(registration) = &result {
        tracing::info!(registration_id = %registration.id, "Registration received");
    }
    respond(&state, revision_id, result).await
}

/// GET /api/registrations - List registrations, newest first.
pub async fn list_registrations(State(state): State<AppState>) -> ApiResult<Vec<Registration>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_registrations().await {
        Ok(registrations) => success(registrations, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/registrations/:id - Delete a registration.
pub async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = state.repo.delete_registration(&id).await;
    respond(&state, revision_id, result).await
}
