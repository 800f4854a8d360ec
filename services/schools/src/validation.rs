//! Submission validation.
//!
//! A pure decision over a [`SchoolForm`]: either a normalised [`NewSchool`]
//! (without its image reference, which is resolved later) or the first
//! rejection reason found.

use crate::models::{NewSchool, SchoolForm};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref CONTACT_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
}

/// Reasons a submission is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All required fields must be provided")]
    MissingFields,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Contact must be a 10-digit number")]
    InvalidContact,

    #[error("{field} must be at least {min} characters")]
    FieldTooShort { field: &'static str, min: usize },

    #[error("Only image files are allowed")]
    InvalidImageType,

    #[error("Image size must be less than 10MB")]
    ImageTooLarge,
}

impl ValidationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingFields => "MISSING_FIELDS",
            ValidationError::InvalidEmail => "INVALID_EMAIL",
            ValidationError::InvalidContact => "INVALID_CONTACT",
            ValidationError::FieldTooShort { .. } => "FIELD_TOO_SHORT",
            ValidationError::InvalidImageType => "INVALID_IMAGE_TYPE",
            ValidationError::ImageTooLarge => "IMAGE_TOO_LARGE",
        }
    }
}

/// Validate a submission and return the normalised record fields.
///
/// Checks run in order: presence of all six text fields, email shape, contact
/// digits, minimum lengths, then image type and size when an image is attached.
pub fn validate(form: &SchoolForm) -> Result<NewSchool, ValidationError> {
    let name = form.name.trim();
    let address = form.address.trim();
    let city = form.city.trim();
    let state = form.state.trim();
    let contact = form.contact.trim();
    let email = form.email_id.trim();

    if [name, address, city, state, contact, email]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(ValidationError::MissingFields);
    }

    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }

    if !CONTACT_RE.is_match(contact) {
        return Err(ValidationError::InvalidContact);
    }

    for (field, value, min) in [
        ("School name", name, 2),
        ("Address", address, 5),
        ("City", city, 2),
        ("State", state, 2),
    ] {
        if value.chars().count() < min {
            return Err(ValidationError::FieldTooShort { field, min });
        }
    }

    if let Some(image) = &form.image {
        if !image.content_type.starts_with("image/") {
            return Err(ValidationError::InvalidImageType);
        }
        if image.size() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge);
        }
    }

    Ok(NewSchool {
        name: name.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        contact: contact.to_string(),
        email_id: email.to_lowercase(),
        image: None,
    })
}
