//! Multipart request bodies and the profile picture pipeline.

use axum::extract::Multipart;

use crate::crop::{CropSpec, CropTool};
use crate::errors::AppError;
use crate::media::{inspect_image, MediaUpload, StoredMedia};
use crate::models::UpdateMemberRequest;
use crate::AppState;

/// Folder profile pictures are stored under.
const PROFILE_FOLDER: &str = "profiles";

/// A file taken from a multipart field.
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Member edit form: `data` (JSON fields), optional `profilePicture` file and
/// optional `crop` (JSON [`CropSpec`]) applied to the picture.
pub(crate) struct MemberEditForm {
    pub data: UpdateMemberRequest,
    pub picture: Option<UploadedFile>,
    pub crop: Option<CropSpec>,
}

impl MemberEditForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut data: Option<UpdateMemberRequest> = None;
        let mut picture = None;
        let mut crop: Option<CropSpec> = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("data") => data = Some(serde_json::from_str(&field.text().await?)?),
                Some("crop") => crop = Some(serde_json::from_str(&field.text().await?)?),
                Some("profilePicture") => {
                    let file_name = field.file_name().unwrap_or("profile").to_string();
                    let bytes = field.bytes().await?.to_vec();
                    picture = Some(UploadedFile { file_name, bytes });
                }
                other => tracing::debug!("Ignoring multipart field {:?}", other),
            }
        }

        if crop.is_some() && picture.is_none() {
            return Err(AppError::Validation(
                "A crop was given without a profile picture".to_string(),
            ));
        }

        Ok(Self {
            data: data.unwrap_or_default(),
            picture,
            crop,
        })
    }
}

/// Check, optionally crop, and upload a member's profile picture.
pub(crate) async fn store_profile_picture(
    state: &AppState,
    member_id: &str,
    picture: UploadedFile,
    crop: Option<CropSpec>,
) -> Result<StoredMedia, AppError> {
    let format = inspect_image(&picture.bytes, state.config.max_upload_bytes)?;

    let (bytes, mime_type, file_name) = match crop {
        Some(spec) => {
            let source = picture.bytes;
            let cropped = tokio::task::spawn_blocking(move || CropTool::apply(&source, &spec))
                .await
                .map_err(|e| AppError::Internal(format!("Crop task failed: {}", e)))??;
            (cropped.bytes, cropped.mime_type.to_string(), "profile.jpg".to_string())
        }
        None => (
            picture.bytes,
            format.to_mime_type().to_string(),
            picture.file_name,
        ),
    };

    state
        .media
        .store(MediaUpload {
            bytes,
            file_name,
            mime_type,
            folder: PROFILE_FOLDER.to_string(),
            public_id: format!("member-{}", member_id),
        })
        .await
}
