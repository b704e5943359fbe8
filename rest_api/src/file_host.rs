// rest_api/src/file_host.rs

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use models::errors::{MedipalError, MedipalResult};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Folder for prescription images and signatures.
pub const UPLOADS_FOLDER: &str = "uploads";
/// Folder for doctor license scans.
pub const LICENSE_FOLDER: &str = "doctor_licenses";

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores files somewhere public and returns their URL.
#[async_trait]
pub trait FileHost: Send + Sync {
    async fn upload(&self, folder: &str, file: UploadedFile) -> MedipalResult<String>;
}

/// Used when no image host is configured. Every upload fails.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredHost;

#[async_trait]
impl FileHost for UnconfiguredHost {
    async fn upload(&self, _folder: &str, file: UploadedFile) -> MedipalResult<String> {
        warn!("Image host is not configured, rejecting upload of {}", file.file_name);
        Err(MedipalError::Upstream("image host is not configured".into()))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for CloudinarySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinarySettings")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryHost {
    client: reqwest::Client,
    settings: CloudinarySettings,
}

impl CloudinaryHost {
    pub fn new(settings: CloudinarySettings) -> MedipalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MedipalError::Internal(format!("failed to build HTTP client: {}", e)))?;
        info!("Uploads go to Cloudinary cloud {}", settings.cloud_name);
        Ok(CloudinaryHost { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("https://api.cloudinary.com/v1_1/{}/image/upload", self.settings.cloud_name)
    }
}

/// Signature over the signed parameters, sorted by name, followed by the secret.
pub fn sign_upload(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let to_sign = format!("folder={}&timestamp={}{}", folder, timestamp, api_secret);
    format!("{:x}", Sha256::digest(to_sign.as_bytes()))
}

#[async_trait]
impl FileHost for CloudinaryHost {
    async fn upload(&self, folder: &str, file: UploadedFile) -> MedipalResult<String> {
        let timestamp = Utc::now().timestamp();
        let signature = sign_upload(folder, timestamp, &self.settings.api_secret);

        let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| MedipalError::Validation(models::ValidationError::invalid("file", e.to_string())))?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.settings.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| MedipalError::Upstream(format!("image host unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Image host answered {}: {}", status, body);
            return Err(MedipalError::Upstream(format!("image host rejected upload with {}", status)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MedipalError::Upstream(format!("unexpected image host response: {}", e)))?;
        info!("Uploaded {} to {}", file.file_name, folder);
        Ok(uploaded.secure_url)
    }
}
