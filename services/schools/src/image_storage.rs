//! Image storage resolution.
//!
//! An uploaded image is handed to an ordered list of [`ImageStore`] strategies.
//! The first strategy that succeeds produces the resolved reference; a failing
//! strategy is logged and the next one is tried. Only the failure of the last
//! strategy (always local disk) is returned to the caller.

use crate::cloudinary_uploader::CloudinaryUploader;
use crate::config::Config;
use crate::local_storage::LocalImageStore;
use crate::models::ImageUpload;
use crate::s3_uploader::S3Uploader;
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors produced by a storage strategy
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Remote upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Remote upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Remote upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("S3 upload failed: {0}")]
    S3(String),

    #[error("Failed to write image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No image storage strategy configured")]
    NoStrategy,
}

/// A place an image can be stored
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Short backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Store the image and return a reference it can later be fetched by
    async fn store(&self, image: &ImageUpload) -> Result<String, StorageError>;
}

/// Ordered chain of storage strategies
#[derive(Clone)]
pub struct StorageResolver {
    strategies: Vec<Arc<dyn ImageStore>>,
}

impl std::fmt::Debug for StorageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

impl StorageResolver {
    pub fn new(strategies: Vec<Arc<dyn ImageStore>>) -> Self {
        Self { strategies }
    }

    /// Build the chain from configuration: at most one remote backend
    /// (Cloudinary preferred over S3), then local disk.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut strategies: Vec<Arc<dyn ImageStore>> = Vec::new();

        if let Some(credentials) = config.cloudinary.credentials() {
            let uploader = CloudinaryUploader::new(&config.cloudinary, credentials)
                .context("Failed to initialize Cloudinary uploader")?;
            strategies.push(Arc::new(uploader));

            if config.s3.is_some() {
                warn!("Both Cloudinary and S3 are configured, S3 will not be used");
            }
        } else if let Some(s3) = &config.s3 {
            let uploader = S3Uploader::new(s3)
                .await
                .context("Failed to initialize S3 uploader")?;
            strategies.push(Arc::new(uploader));
        } else {
            info!("Remote image storage not configured, images are stored locally");
        }

        strategies.push(Arc::new(LocalImageStore::new(&config.local_storage)));

        Ok(Self::new(strategies))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve an optional image into a stored reference.
    ///
    /// Returns `Ok(None)` without touching any backend when there is no image.
    #[instrument(skip_all, fields(has_image = image.is_some()))]
    pub async fn resolve(&self, image: Option<&ImageUpload>) -> Result<Option<String>, StorageError> {
        let Some(image) = image else {
            return Ok(None);
        };

        let mut last_error = StorageError::NoStrategy;

        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.store(image).await {
                Ok(reference) => {
                    debug!(backend = strategy.name(), reference = %reference, "Image stored");
                    metrics::counter!("schools.images.stored", "backend" => strategy.name())
                        .increment(1);
                    if index > 0 {
                        metrics::counter!("schools.images.fallback", "backend" => strategy.name())
                            .increment(1);
                    }
                    return Ok(Some(reference));
                }
                Err(e) => {
                    warn!(
                        backend = strategy.name(),
                        error = %e,
                        "Image storage strategy failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn png() -> ImageUpload {
        ImageUpload::new("logo.png", "image/png", vec![137u8, 80, 78, 71])
    }

    fn store_returning(
        name: &'static str,
        result: fn() -> Result<String, StorageError>,
        seq: &mut Sequence,
    ) -> MockImageStore {
        let mut store = MockImageStore::new();
        store.expect_name().return_const(name);
        store
            .expect_store()
            .times(1)
            .in_sequence(seq)
            .returning(move |_| result());
        store
    }

    #[tokio::test]
    async fn test_no_image_touches_no_backend() {
        let mut store = MockImageStore::new();
        store.expect_name().return_const("remote");
        store.expect_store().never();

        let resolver = StorageResolver::new(vec![Arc::new(store)]);
        assert_eq!(resolver.resolve(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let mut seq = Sequence::new();
        let remote = store_returning(
            "remote",
            || Ok("https://cdn.example.com/schools/school-1.png".to_string()),
            &mut seq,
        );
        let mut local = MockImageStore::new();
        local.expect_name().return_const("local");
        local.expect_store().never();

        let resolver = StorageResolver::new(vec![Arc::new(remote), Arc::new(local)]);
        let reference = resolver.resolve(Some(&png())).await.unwrap();
        assert_eq!(
            reference.as_deref(),
            Some("https://cdn.example.com/schools/school-1.png")
        );
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let mut seq = Sequence::new();
        let remote = store_returning(
            "remote",
            || Err(StorageError::Timeout(Duration::from_secs(15))),
            &mut seq,
        );
        let local = store_returning(
            "local",
            || Ok("/schoolImages/school-1.png".to_string()),
            &mut seq,
        );

        let resolver = StorageResolver::new(vec![Arc::new(remote), Arc::new(local)]);
        let reference = resolver.resolve(Some(&png())).await.unwrap();
        assert_eq!(reference.as_deref(), Some("/schoolImages/school-1.png"));
    }

    #[tokio::test]
    async fn test_only_last_failure_is_surfaced() {
        let mut seq = Sequence::new();
        let remote = store_returning(
            "remote",
            || {
                Err(StorageError::Rejected {
                    status: 401,
                    message: "Invalid Signature".to_string(),
                })
            },
            &mut seq,
        );
        let local = store_returning(
            "local",
            || {
                Err(StorageError::Io {
                    path: PathBuf::from("/readonly/school-1.png"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
            },
            &mut seq,
        );

        let resolver = StorageResolver::new(vec![Arc::new(remote), Arc::new(local)]);
        let err = resolver.resolve(Some(&png())).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn test_empty_chain_is_an_error() {
        let resolver = StorageResolver::new(Vec::new());
        let err = resolver.resolve(Some(&png())).await.unwrap_err();
        assert!(matches!(err, StorageError::NoStrategy));
    }

    #[tokio::test]
    async fn test_from_config_without_remote_is_local_only() {
        let resolver = StorageResolver::from_config(&Config::default()).await.unwrap();
        assert_eq!(resolver.strategy_names(), ["local"]);
    }

    #[tokio::test]
    async fn test_from_config_with_cloudinary_puts_remote_first() {
        let mut config = Config::default();
        config.cloudinary.cloud_name = Some("demo".to_string());
        config.cloudinary.api_key = Some("123".to_string());
        config.cloudinary.api_secret = Some("abc".to_string());

        let resolver = StorageResolver::from_config(&config).await.unwrap();
        assert_eq!(resolver.strategy_names(), ["cloudinary", "local"]);
    }
}
