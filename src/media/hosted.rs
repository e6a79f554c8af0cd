//! Signed uploads to a Cloudinary-style media host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{MediaStore, MediaUpload, StoredMedia};
use crate::config::MediaConfig;
use crate::errors::AppError;

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    format: String,
    bytes: u64,
}

#[derive(Deserialize)]
struct HostErrorResponse {
    error: HostError,
}

#[derive(Deserialize)]
struct HostError {
    message: String,
}

pub struct HostedMediaStore {
    client: Client,
    config: MediaConfig,
}

impl HostedMediaStore {
    pub fn new(config: MediaConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

#[async_trait]
impl MediaStore for HostedMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<StoredMedia, AppError> {
        let folder = format!("{}/{}", self.config.folder, upload.folder);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", folder.as_str()),
                ("public_id", upload.public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let size = upload.bytes.len();
        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.clone())
            .text("public_id", upload.public_id.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        tracing::debug!(folder = %folder, public_id = %upload.public_id, size, "Uploading image to media host");

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<HostErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("Media host responded with {}", status));
            tracing::error!(%status, "Media host rejected upload: {}", message);
            return Err(AppError::Media(message));
        }

        let body: UploadResponse = response.json().await?;
        tracing::info!(public_id = %body.public_id, bytes = body.bytes, "Stored image on media host");

        Ok(StoredMedia {
            secure_url: body.secure_url,
            public_id: body.public_id,
            format: body.format,
            bytes: body.bytes,
        })
    }
}

/// Hex SHA-256 over the parameters sorted by name, joined as `k=v&k=v`, with
/// the API secret appended.
pub(crate) fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
