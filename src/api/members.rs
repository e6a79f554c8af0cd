//! Member administration endpoints.

use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::multipart::{store_profile_picture, MemberEditForm};
use super::{error, respond, ApiResult};
use crate::auth::{generate_token, hash_password, Session};
use crate::errors::AppError;
use crate::mailer::Invitation;
use crate::models::{
    BatchDisplayOrderRequest, CreateMemberRequest, Member, PasswordResetRequest,
    UpdateMemberRequest, YearlyRole,
};
use crate::team::reconcile_yearly_roles;
use crate::validation::{require, validate_email, validate_password, ValidationError};
use crate::AppState;

/// Length of generated temporary passwords.
const TEMPORARY_PASSWORD_LEN: usize = 16;

/// Result of an invitation. The temporary password is only returned when no
/// invitation email was sent, so the admin can pass it on.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub member: Member,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

/// GET /api/members - List all members in display order.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_members().await {
        Ok(members) => super::success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/members/:id - Get a single member.
pub async fn get_member(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_member(&id).await {
        Ok(Some(member)) => super::success(member, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Member {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/members - Invite a new member.
pub async fn invite_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<InviteResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = invite(&state, request).await;
    respond(&state, revision_id, result).await
}

async fn invite(state: &AppState, request: CreateMemberRequest) -> Result<InviteResponse, AppError> {
    require("Name", &request.name)?;
    validate_email(&request.email)?;
    let yearly_roles = reconcile_yearly_roles(&request.team_years, &request.yearly_roles)?;

    let temporary_password: String = generate_token()
        .chars()
        .take(TEMPORARY_PASSWORD_LEN)
        .collect();
    let password_hash = hash_password(&temporary_password)?;

    let member = state
        .repo
        .create_member(&request, &yearly_roles, &password_hash)
        .await?;
    tracing::info!(member_id = %member.id, years = ?member.team_years, "Invited member");

    let mut email_sent = false;
    if request.send_email {
        let invitation = Invitation {
            name: member.name.clone(),
            email: member.email.clone(),
            temporary_password: temporary_password.clone(),
        };
        match state.mailer.send_invitation(&invitation).await {
            Ok(()) => email_sent = true,
            Err(e) => tracing::warn!(member_id = %member.id, "Invitation email failed: {}", e),
        }
    }

    Ok(InviteResponse {
        member,
        email_sent,
        temporary_password: (!email_sent).then_some(temporary_password),
    })
}

/// PUT /api/members/:id - Admin edit (multipart, optional profile picture).
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let form = MemberEditForm::read(multipart).await?;
        apply_edit(&state, &id, form).await
    }
    .await;

    respond(&state, revision_id, result).await
}

/// PUT /api/me - Self-service profile edit. Role, status and team years are
/// left to admins.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let member_id = session.require_member()?.id.clone();
        let mut form = MemberEditForm::read(multipart).await?;
        form.data = UpdateMemberRequest {
            role: None,
            team_role: None,
            active: None,
            team_years: None,
            yearly_roles: None,
            ..form.data
        };
        apply_edit(&state, &member_id, form).await
    }
    .await;

    respond(&state, revision_id, result).await
}

async fn apply_edit(state: &AppState, id: &str, form: MemberEditForm) -> Result<Member, AppError> {
    let request = form.data;

    if let Some(name) = &request.name {
        require("Name", name)?;
    }
    if let Some(email) = &request.email {
        validate_email(email)?;
    }
    let yearly_roles = edited_yearly_roles(&request)?;

    if state.repo.get_member(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Member {} not found", id)));
    }

    let profile = match form.picture {
        Some(picture) => Some(store_profile_picture(state, id, picture, form.crop).await?),
        None => None,
    };

    let member = state
        .repo
        .update_member(id, &request, yearly_roles.as_deref(), profile.as_ref())
        .await?;
    tracing::info!(member_id = %id, picture = profile.is_some(), "Updated member");
    Ok(member)
}

/// Yearly roles to store for an edit, if the edit touches them.
fn edited_yearly_roles(request: &UpdateMemberRequest) -> Result<Option<Vec<YearlyRole>>, ValidationError> {
    match (&request.team_years, &request.yearly_roles) {
        (Some(years), roles) => {
            let roles = roles.as_deref().unwrap_or_default();
            reconcile_yearly_roles(years, roles).map(Some)
        }
        (None, Some(roles)) => {
            let years: Vec<i32> = roles.iter().map(|r| r.year).collect();
            reconcile_yearly_roles(&years, roles).map(Some)
        }
        (None, None) => Ok(None),
    }
}

/// PATCH /api/members/:id/active - Toggle active status.
pub async fn toggle_member_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Member> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = state.repo.toggle_active(&id).await;
    if let Ok(member) = &result {
        tracing::info!(member_id = %id, active = member.active, "Toggled member status");
    }
    respond(&state, revision_id, result).await
}

/// DELETE /api/members/:id - Delete a member. Admins cannot delete themselves.
pub async fn delete_member(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if session.member_id() == Some(id.as_str()) {
        return error(AppError::CannotDeleteSelf, revision_id);
    }

    let result = state.repo.delete_member(&id).await;
    if result.is_ok() {
        tracing::info!(member_id = %id, "Deleted member");
    }
    respond(&state, revision_id, result).await
}

/// PUT /api/members/display-order - Persist a batch of display orders.
pub async fn update_display_order(
    State(state): State<AppState>,
    Json(request): Json<BatchDisplayOrderRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.updates.is_empty() {
        return error(ValidationError::EmptyBatch.into(), revision_id);
    }

    let result = state.repo.batch_update_display_order(&request.updates).await;
    if result.is_ok() {
        tracing::info!(count = request.updates.len(), "Saved display order");
    }
    respond(&state, revision_id, result).await
}

/// POST /api/members/:id/password - Set a new password for a member.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PasswordResetRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        validate_password(&request.new_password)?;
        let hash = hash_password(&request.new_password)?;
        state.repo.set_password(&id, &hash).await
    }
    .await;

    if result.is_ok() {
        tracing::info!(member_id = %id, "Password reset");
    }
    respond(&state, revision_id, result).await
}
