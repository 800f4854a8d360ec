//! Schools Service
//!
//! Registers schools submitted through a web form, stores their images and
//! lists them back as a browsable grid.
//!
//! ## Features
//!
//! - **Submission Validation**: presence, email shape, 10-digit contact
//!   numbers, minimum lengths, image type and a 10MB image limit
//! - **Image Storage with Fallback**: uploads to Cloudinary (or an
//!   S3-compatible bucket) and falls back to a local directory served as
//!   static assets when the remote store is unavailable
//! - **Record Store**: PostgreSQL-backed, with an in-memory store for local
//!   development and tests
//! - **Pages and JSON API**: server-rendered form and listing pages plus
//!   `/api/schools` for programmatic access
//!
//! ## Architecture
//!
//! ```text
//!  Form / API            Validator        Storage Resolver          Record Store
//! ┌──────────────┐     ┌────────────┐    ┌──────────────────┐     ┌──────────────┐
//! │ POST         │────▶│ validate   │───▶│ 1. Cloudinary/S3 │────▶│ schools      │
//! │ /add-school  │     └────────────┘    │ 2. local disk    │     │ (PostgreSQL) │
//! │ /api/schools │                       └──────────────────┘     └──────────────┘
//! └──────────────┘                                                        │
//!        ▲                                                                │
//!        │                 ┌──────────────┐                               │
//!        └─────────────────│ GET /schools │◀──────────────────────────────┘
//!                          └──────────────┘
//! ```

pub mod api;
pub mod cloudinary_uploader;
pub mod config;
pub mod error;
pub mod image_storage;
pub mod local_storage;
pub mod models;
pub mod pages;
pub mod registration;
pub mod s3_uploader;
pub mod school_store;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ErrorResponse, SchoolError};
pub use image_storage::{ImageStore, StorageError, StorageResolver};
pub use local_storage::LocalImageStore;
pub use models::{ImageUpload, NewSchool, School, SchoolForm};
pub use pages::{resolve_image_url, Pages};
pub use registration::SchoolService;
pub use school_store::{MemorySchoolStore, PgSchoolStore, SchoolStore, StoreError};
pub use validation::{validate, ValidationError, MAX_IMAGE_BYTES};
