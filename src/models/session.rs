//! Login, revision and upload payloads.

use serde::{Deserialize, Serialize};

use super::Member;

/// Request body for logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login: a bearer token and the member it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub member: Member,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// An image stored on the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub format: String,
    pub bytes: u64,
}

/// Result of an image upload request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub images: Vec<UploadedImage>,
}
