//! Login, logout and the caller's own profile.

use axum::{extract::State, http::HeaderMap, Extension, Json};

use super::{error, respond, success, ApiResult};
use crate::auth::{bearer_token_from_headers, generate_token, token_digest, verify_password, Session};
use crate::errors::AppError;
use crate::models::{LoginRequest, LoginResponse, Member};
use crate::AppState;

/// POST /api/auth/login - Exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let (member, hash) = state
            .repo
            .find_credentials(&request.email)
            .await?
            .ok_or_else(invalid)?;

        let verified = hash
            .as_deref()
            .is_some_and(|hash| verify_password(&request.password, hash));
        if !verified {
            tracing::info!(email = %request.email, "Rejected login");
            return Err(invalid());
        }
        if !member.active {
            return Err(AppError::Forbidden("This account is deactivated".to_string()));
        }

        let token = generate_token();
        state.repo.create_session(&token_digest(&token), &member.id).await?;
        tracing::info!(member_id = %member.id, "Member logged in");

        Ok::<_, AppError>(LoginResponse { token, member })
    }
    .await;

    match result {
        Ok(response) => success(response, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/auth/logout - Revoke the presented token.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = match bearer_token_from_headers(&headers) {
        Some(token) => state.repo.delete_session(&token_digest(&token)).await,
        None => Err(AppError::Unauthorized(
            "Missing or invalid bearer token".to_string(),
        )),
    };

    respond(&state, revision_id, result).await
}

/// GET /api/me - The logged-in member.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match session.require_member() {
        Ok(member) => success(member.clone(), revision_id),
        Err(e) => error(e, revision_id),
    }
}
