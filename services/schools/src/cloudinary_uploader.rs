use crate::config::{CloudinaryConfig, CloudinaryCredentials};
use crate::image_storage::{ImageStore, StorageError};
use crate::models::ImageUpload;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Limit to 800x600 keeping aspect ratio (never upscales), then let the CDN
/// pick quality and format.
const TRANSFORMATION: &str = "c_limit,h_600,w_800/f_auto,q_auto";

/// Signed uploads to the Cloudinary upload API
pub struct CloudinaryUploader {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: String,
    folder: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(
        config: &CloudinaryConfig,
        credentials: CloudinaryCredentials<'_>,
    ) -> Result<Self, StorageError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let upload_url = format!(
            "{}/v1_1/{}/image/upload",
            config.api_base_url.trim_end_matches('/'),
            credentials.cloud_name
        );

        info!(
            cloud_name = %credentials.cloud_name,
            folder = %config.folder,
            "Cloudinary uploader initialized"
        );

        Ok(Self {
            client,
            upload_url,
            api_key: credentials.api_key.to_string(),
            api_secret: credentials.api_secret.to_string(),
            folder: config.folder.clone(),
            timeout,
        })
    }

    /// Parameters covered by the signature, in alphabetical order
    fn signed_params(&self, public_id: &str, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("folder", self.folder.clone()),
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.to_string()),
            ("transformation", TRANSFORMATION.to_string()),
        ]
    }
}

/// Cloudinary request signature: SHA-1 over `k=v&k=v...` (sorted) followed by
/// the API secret, hex encoded.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha1::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

#[async_trait]
impl ImageStore for CloudinaryUploader {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    #[instrument(skip(self, image), fields(file_name = %image.file_name, size_bytes = image.size()))]
    async fn store(&self, image: &ImageUpload) -> Result<String, StorageError> {
        let now = Utc::now();
        let public_id = format!("school-{}", now.timestamp_millis());
        let params = self.signed_params(&public_id, now.timestamp());
        let signature = sign_params(&params, &self.api_secret);

        let file = Part::bytes(image.data.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        debug!(public_id = %public_id, "Uploading image to Cloudinary");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout(self.timeout)
                } else {
                    StorageError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response.json().await?;

        info!(
            public_id = uploaded.public_id.as_deref().unwrap_or(&public_id),
            url = %uploaded.secure_url,
            "Image uploaded to Cloudinary"
        );

        Ok(uploaded.secure_url)
    }
}
