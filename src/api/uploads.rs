//! Image upload endpoint.

use axum::extract::{Multipart, State};

use super::multipart::UploadedFile;
use super::{respond, ApiResult};
use crate::errors::AppError;
use crate::media::prepare_upload;
use crate::models::{UploadResponse, UploadedImage};
use crate::AppState;

/// Most files accepted in one request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

const DEFAULT_FOLDER: &str = "uploads";

/// POST /api/uploads - Store images (`images` fields, optional `folder`) on
/// the media host. Files are uploaded one after another; the first failure
/// aborts the request.
pub async fn upload_images(State(state): State<AppState>, multipart: Multipart) -> ApiResult<UploadResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = store_all(&state, multipart).await;
    respond(&state, revision_id, result).await
}

async fn store_all(state: &AppState, mut multipart: Multipart) -> Result<UploadResponse, AppError> {
    let mut files = Vec::new();
    let mut folder = DEFAULT_FOLDER.to_string();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("images") => {
                if files.len() == MAX_FILES_PER_UPLOAD {
                    return Err(AppError::Validation(format!(
                        "At most {} images can be uploaded at once",
                        MAX_FILES_PER_UPLOAD
                    )));
                }
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await?.to_vec();
                files.push(UploadedFile { file_name, bytes });
            }
            Some("folder") => folder = sanitize_folder(&field.text().await?),
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    if files.is_empty() {
        return Err(AppError::Validation("No images were provided".to_string()));
    }

    let max_bytes = state.config.max_upload_bytes;
    let uploads = files
        .into_iter()
        .map(|file| prepare_upload(file.bytes, &file.file_name, &folder, max_bytes))
        .collect::<Result<Vec<_>, _>>()?;

    let mut images = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let stored = state.media.store(upload).await?;
        images.push(UploadedImage {
            url: stored.secure_url,
            public_id: stored.public_id,
            format: stored.format,
            bytes: stored.bytes,
        });
    }

    tracing::info!(count = images.len(), folder = %folder, "Uploaded images");
    Ok(UploadResponse { images })
}

/// Lowercase path segments of `[a-z0-9_-]`; anything else collapses to the
/// default folder.
fn sanitize_folder(raw: &str) -> String {
    let segments: Vec<String> = raw
        .split('/')
        .map(|segment| {
            segment
                .trim()
                .to_ascii_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder("events"), "events");
        assert_eq!(sanitize_folder("Events/2024 Fest"), "events/2024fest");
        assert_eq!(sanitize_folder("../../etc"), "etc");
        assert_eq!(sanitize_folder("  "), DEFAULT_FOLDER);
        assert_eq!(sanitize_folder("../.."), DEFAULT_FOLDER);
    }
}
