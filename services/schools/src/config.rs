use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the schools service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// HTTP configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Cloudinary credentials and upload options
    #[serde(default)]
    pub cloudinary: CloudinaryConfig,
    /// Alternative S3-compatible remote storage
    #[serde(default)]
    pub s3: Option<S3Config>,
    /// Local fallback storage
    #[serde(default)]
    pub local_storage: LocalStorageConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Records are kept in memory when unset.
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Run migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default)]
    pub cors_enabled: bool,
    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum request body size. Must stay above the image limit so oversized
    /// images are rejected by validation rather than by the transport.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Cloudinary configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Folder uploads are placed in
    #[serde(default = "default_cloudinary_folder")]
    pub folder: String,
    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_cloudinary_api_base_url")]
    pub api_base_url: String,
    /// Upload timeout in seconds
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Credentials that are all present, borrowed from [`CloudinaryConfig`]
#[derive(Debug, Clone, Copy)]
pub struct CloudinaryCredentials<'a> {
    pub cloud_name: &'a str,
    pub api_key: &'a str,
    pub api_secret: &'a str,
}

/// S3-compatible storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket name for school images
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Base URL objects are publicly reachable under
    pub public_base_url: Option<String>,
    /// Key prefix ("folder") for uploads
    #[serde(default = "default_cloudinary_folder")]
    pub key_prefix: String,
    /// Upload timeout in seconds
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local fallback storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// Directory image files are written to
    #[serde(default = "default_local_directory")]
    pub directory: String,
    /// URL path the directory is served under
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

// Default value functions
fn default_service_name() -> String {
    "schools-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024 // 20MB
}

fn default_cloudinary_folder() -> String {
    "schools".to_string()
}

fn default_cloudinary_api_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_remote_timeout_secs() -> u64 {
    15
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_local_directory() -> String {
    "public/schoolImages".to_string()
}

fn default_public_prefix() -> String {
    "/schoolImages".to_string()
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .set_default("service.name", "schools-service")?
            .set_default("service.log_level", "info")?
            .set_default("service.metrics_port", 9090)?
            .add_source(config::File::with_name("config/schools").required(false))
            .add_source(config::File::with_name("/etc/schools/schools").required(false))
            // SCHOOLS__DATABASE__URL -> database.url
            .add_source(
                config::Environment::with_prefix("SCHOOLS")
                    .separator("__")
                    .try_parsing(true),
            )
            // Un-prefixed names used by existing deployments
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option(
                "cloudinary.cloud_name",
                std::env::var("CLOUDINARY_CLOUD_NAME").ok(),
            )?
            .set_override_option("cloudinary.api_key", std::env::var("CLOUDINARY_API_KEY").ok())?
            .set_override_option(
                "cloudinary.api_secret",
                std::env::var("CLOUDINARY_API_SECRET").ok(),
            )?
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl DatabaseConfig {
    /// Pool acquire timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Idle connection timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl CloudinaryConfig {
    /// Returns the credentials only when cloud name, key and secret are all set
    /// and non-blank.
    pub fn credentials(&self) -> Option<CloudinaryCredentials<'_>> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        Some(CloudinaryCredentials {
            cloud_name: present(&self.cloud_name)?,
            api_key: present(&self.api_key)?,
            api_secret: present(&self.api_secret)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl S3Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            run_migrations: default_true(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: false,
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: default_cloudinary_folder(),
            api_base_url: default_cloudinary_api_base_url(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            directory: default_local_directory(),
            public_prefix: default_public_prefix(),
        }
    }
}
