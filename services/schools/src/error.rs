use crate::image_storage::StorageError;
use crate::school_store::StoreError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by school operations
#[derive(Error, Debug)]
pub enum SchoolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Image storage failed: {0}")]
    ImageStorageFailed(#[source] StorageError),

    #[error("Persistence error: {0}")]
    Persistence(#[source] StoreError),

    #[error("School {0} not found")]
    NotFound(i64),

    #[error("Valid school ID is required")]
    InvalidId,

    #[error("Invalid form data: {0}")]
    InvalidForm(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl SchoolError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SchoolError::Validation(_) | SchoolError::InvalidId | SchoolError::InvalidForm(_) => {
                StatusCode::BAD_REQUEST
            }
            SchoolError::NotFound(_) => StatusCode::NOT_FOUND,
            SchoolError::ImageStorageFailed(_) | SchoolError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SchoolError::Validation(e) => e.code(),
            SchoolError::ImageStorageFailed(_) => "IMAGE_STORAGE_FAILED",
            SchoolError::Persistence(_) => "PERSISTENCE_ERROR",
            SchoolError::NotFound(_) => "NOT_FOUND",
            SchoolError::InvalidId => "INVALID_ID",
            SchoolError::InvalidForm(_) => "INVALID_FORM",
        }
    }

    /// Message safe to show to users. Server-side failures stay generic.
    pub fn public_message(&self) -> String {
        match self {
            SchoolError::ImageStorageFailed(_) | SchoolError::Persistence(_) => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
            SchoolError::NotFound(_) => "School not found".to_string(),
            SchoolError::InvalidForm(_) => "Invalid form data".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for SchoolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SchoolError::NotFound(id),
            other => SchoolError::Persistence(other),
        }
    }
}

impl IntoResponse for SchoolError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.public_message(),
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            SchoolError::from(ValidationError::InvalidContact).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(SchoolError::InvalidId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(SchoolError::NotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            SchoolError::Persistence(StoreError::Database(sqlx::Error::PoolClosed)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: SchoolError = StoreError::NotFound(42).into();
        assert!(matches!(err, SchoolError::NotFound(42)));
    }

    #[test]
    fn test_server_errors_do_not_leak_details() {
        let err = SchoolError::Persistence(StoreError::Database(sqlx::Error::Protocol(
            "password authentication failed for user admin".to_string(),
        )));
        assert!(!err.public_message().contains("password"));
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }

    #[test]
    fn test_validation_message_is_user_facing() {
        let err = SchoolError::from(ValidationError::ImageTooLarge);
        assert_eq!(err.public_message(), "Image size must be less than 10MB");
        assert_eq!(err.code(), "IMAGE_TOO_LARGE");
    }
}
