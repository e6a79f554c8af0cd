//! Image uploads delegated to an external media host.
//!
//! Files are checked locally (size, sniffed type) before anything is sent.
//! The host stores the binary under a folder and identifier we derive and
//! answers with a secure URL, its storage id, format and byte size.

mod hosted;

pub use hosted::HostedMediaStore;

use async_trait::async_trait;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Image formats accepted for upload.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Longest stem kept when deriving a storage identifier from a file name.
const MAX_STEM_LEN: usize = 40;

/// An image ready to be sent to the media host.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Sub-folder below the configured root, e.g. `profiles`
    pub folder: String,
    pub public_id: String,
}

/// What the media host reports after storing an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub secure_url: String,
    pub public_id: String,
    pub format: String,
    pub bytes: u64,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, upload: MediaUpload) -> Result<StoredMedia, AppError>;
}

/// Stand-in used when no media host is configured; every upload is refused.
pub struct UnconfiguredMediaStore;

#[async_trait]
impl MediaStore for UnconfiguredMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<StoredMedia, AppError> {
        tracing::warn!(file = %upload.file_name, "Upload refused: media host is not configured");
        Err(AppError::Media("Media hosting is not configured".to_string()))
    }
}

/// Check an uploaded file and return its sniffed format.
pub fn inspect_image(bytes: &[u8], max_bytes: usize) -> Result<ImageFormat, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {} bytes, the limit is {} bytes",
            bytes.len(),
            max_bytes
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| AppError::UnsupportedMediaType("File is not a recognised image".to_string()))?;

    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Image format {:?} is not accepted",
            format
        )));
    }

    Ok(format)
}

/// Prepare an upload from raw file data, deriving its storage identifier.
pub fn prepare_upload(
    bytes: Vec<u8>,
    file_name: &str,
    folder: &str,
    max_bytes: usize,
) -> Result<MediaUpload, AppError> {
    let format = inspect_image(&bytes, max_bytes)?;
    Ok(MediaUpload {
        bytes,
        file_name: file_name.to_string(),
        mime_type: format.to_mime_type().to_string(),
        folder: folder.to_string(),
        public_id: derive_public_id(file_name),
    })
}

/// Storage identifier: a slug of the file stem plus a short random suffix.
pub fn derive_public_id(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let mut slug = String::new();
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_STEM_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "image" } else { slug };

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug, &suffix[..8])
}
