use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted school record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct School {
    /// Store-assigned identifier, never reused
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Exactly 10 decimal digits
    pub contact: String,
    /// Trimmed and lower-cased
    pub email_id: String,
    /// Resolved image reference: absolute URL or local relative path
    pub image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A validated, normalised record ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
    pub image: Option<String>,
}

/// Raw submission as received from a form post
#[derive(Debug, Clone, Default)]
pub struct SchoolForm {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
    pub image: Option<ImageUpload>,
}

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name declared by the client
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension of the declared file name including the leading dot, reduced to
    /// ASCII alphanumerics. Empty when the name has no usable extension.
    pub fn extension(&self) -> String {
        let ext: String = std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();

        if ext.is_empty() {
            ext
        } else {
            format!(".{}", ext.to_ascii_lowercase())
        }
    }
}
