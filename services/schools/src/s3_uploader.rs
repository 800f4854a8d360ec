use crate::config::S3Config;
use crate::image_storage::{ImageStore, StorageError};
use crate::models::ImageUpload;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// S3 uploader for school images
pub struct S3Uploader {
    client: S3Client,
    bucket: String,
    key_prefix: String,
    public_base_url: String,
    timeout: Duration,
}

impl S3Uploader {
    /// Create a new S3 uploader
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 uploader initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            key_prefix: sanitize_path_component(&config.key_prefix),
            public_base_url: public_base_url(config),
            timeout: config.timeout(),
        })
    }

    /// Object key for an upload.
    /// Format: {prefix}/{date}/school-{millis}-{uuid}{.ext}
    ///
    /// The date level keeps listings and lifecycle rules cheap; the uuid keeps
    /// keys unique across instances uploading in the same millisecond.
    pub fn generate_key(&self, image: &ImageUpload, at: DateTime<Utc>) -> String {
        object_key(&self.key_prefix, image, at, Uuid::new_v4())
    }

    /// Public URL an object key is reachable under
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl ImageStore for S3Uploader {
    fn name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self, image), fields(file_name = %image.file_name, size_bytes = image.size()))]
    async fn store(&self, image: &ImageUpload) -> Result<String, StorageError> {
        let key = self.generate_key(image, Utc::now());

        debug!(s3_key = %key, "Uploading image to S3");

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(image.data.clone()))
            .content_type(&image.content_type)
            .metadata("original-name", sanitize_path_component(&image.file_name))
            .send();

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        info!(s3_key = %key, size_bytes = image.size(), "Image uploaded to S3");

        Ok(self.object_url(&key))
    }
}

fn object_key(prefix: &str, image: &ImageUpload, at: DateTime<Utc>, id: Uuid) -> String {
    format!(
        "{prefix}/{date}/school-{millis}-{id}{ext}",
        prefix = prefix,
        date = at.format("%Y-%m-%d"),
        millis = at.timestamp_millis(),
        id = id,
        ext = image.extension()
    )
}

fn public_base_url(config: &S3Config) -> String {
    let base = match (&config.public_base_url, &config.endpoint_url) {
        (Some(url), _) => url.clone(),
        (None, Some(endpoint)) if config.force_path_style => {
            format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket)
        }
        _ => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.bucket, config.region
        ),
    };
    base.trim_end_matches('/').to_string()
}

/// Sanitize a path component to prevent path traversal
fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
