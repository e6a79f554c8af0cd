//! Bearer-token authentication.
//!
//! Tokens are issued at login and stored only as SHA-256 digests. A static
//! service token from configuration is also accepted and acts as an admin
//! without a member identity; it is compared in constant time.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{Member, SystemRole};
use crate::AppState;

/// The authenticated caller, attached to the request by [`session_layer`].
#[derive(Debug, Clone)]
pub struct Session {
    /// The logged-in member; `None` for the service token
    pub member: Option<Member>,
    pub role: SystemRole,
}

impl Session {
    pub fn member_id(&self) -> Option<&str> {
        self.member.as_ref().map(|m| m.id.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.role.can_manage_members()
    }

    /// The member behind the session, for self-service endpoints.
    pub fn require_member(&self) -> Result<&Member, AppError> {
        self.member
            .as_ref()
            .ok_or_else(|| AppError::Forbidden("This action needs a member login".to_string()))
    }
}

/// Resolve the bearer token into a [`Session`] request extension.
pub async fn session_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = bearer_token(&request) else {
        return error_response(AppError::Unauthorized(
            "Missing or invalid bearer token".to_string(),
        ));
    };

    let session = if state
        .config
        .service_token
        .as_deref()
        .is_some_and(|expected| constant_time_compare(&token, expected))
    {
        Session {
            member: None,
            role: SystemRole::Admin,
        }
    } else {
        match state.repo.session_member(&token_digest(&token)).await {
            Ok(Some(member)) => Session {
                role: member.role,
                member: Some(member),
            },
            Ok(None) => {
                return error_response(AppError::Unauthorized(
                    "Missing or invalid bearer token".to_string(),
                ))
            }
            Err(e) => return error_response(e),
        }
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Reject sessions without admin rights. Must run inside [`session_layer`].
pub async fn admin_layer(request: Request, next: Next) -> Response {
    let allowed = request
        .extensions()
        .get::<Session>()
        .is_some_and(Session::is_admin);

    if allowed {
        next.run(request).await
    } else {
        error_response(AppError::Forbidden(
            "Administrator access required".to_string(),
        ))
    }
}

pub(crate) fn bearer_token(request: &Request) -> Option<String> {
    bearer_token_from_headers(request.headers())
}

pub(crate) fn bearer_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// New random session token.
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn error_response(error: AppError) -> Response {
    let status: StatusCode = error.status_code();
    (status, Json(ErrorResponse::new(&error, 0))).into_response()
}
