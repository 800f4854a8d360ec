use crate::config::LocalStorageConfig;
use crate::image_storage::{ImageStore, StorageError};
use crate::models::ImageUpload;
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Attempts at finding a free file name before giving up
const MAX_NAME_ATTEMPTS: i64 = 64;

/// Writes images into a directory served as static assets
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    directory: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    pub fn new(config: &LocalStorageConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn io_error(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<bool, StorageError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(Self::io_error(path, e)),
        };

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Don't leave a truncated image behind
            if let Err(remove_err) = fs::remove_file(path).await {
                warn!(path = %path.display(), error = %remove_err, "Failed to remove partial image");
            }
            return Err(Self::io_error(path, e));
        }

        Ok(true)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    fn name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, image), fields(file_name = %image.file_name, size_bytes = image.size()))]
    async fn store(&self, image: &ImageUpload) -> Result<String, StorageError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Self::io_error(&self.directory, e))?;

        let extension = image.extension();
        let stamp = Utc::now().timestamp_millis();

        // Same-millisecond uploads bump the stamp instead of overwriting
        for offset in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("school-{}{}", stamp + offset, extension);
            let path = self.directory.join(&file_name);

            if self.write_new(&path, &image.data).await? {
                info!(path = %path.display(), "Image saved to local storage");
                return Ok(format!("{}/{}", self.public_prefix, file_name));
            }
        }

        let path = self.directory.join(format!("school-{}{}", stamp, extension));
        Err(Self::io_error(
            &path,
            std::io::Error::new(ErrorKind::AlreadyExists, "no free image file name"),
        ))
    }
}
