//! Server-rendered pages: landing page, submission form and listing grid.

use crate::api::{read_school_form, AppState};
use crate::error::SchoolError;
use crate::models::{School, SchoolForm};
use crate::validation::MAX_IMAGE_BYTES;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use handlebars::{Handlebars, RenderError, TemplateError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::error;

pub const PLACEHOLDER_PATH: &str = "/static/school-placeholder.svg";
const PLACEHOLDER_SVG: &str = include_str!("../assets/school-placeholder.svg");

lazy_static! {
    /// RFC 3986 scheme followed by ':'
    static ref URI_SCHEME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
}

/// Turn a stored image reference into something a browser can fetch.
///
/// Absolute URLs are used as-is, rooted paths are kept, and bare file names are
/// placed under the local image prefix.
pub fn resolve_image_url(reference: &str, image_prefix: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if URI_SCHEME_RE.is_match(reference) || reference.starts_with('/') {
        Some(reference.to_string())
    } else {
        Some(format!("{}/{}", image_prefix.trim_end_matches('/'), reference))
    }
}

/// Page templates
pub struct Pages {
    registry: Handlebars<'static>,
    image_prefix: String,
}

impl std::fmt::Debug for Pages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages")
            .field("templates", &self.registry.get_templates().keys().collect::<Vec<_>>())
            .field("image_prefix", &self.image_prefix)
            .finish()
    }
}

/// Submitted values echoed back into the form
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormValues {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
}

impl From<&SchoolForm> for FormValues {
    fn from(form: &SchoolForm) -> Self {
        Self {
            name: form.name.clone(),
            address: form.address.clone(),
            city: form.city.clone(),
            state: form.state.clone(),
            contact: form.contact.clone(),
            email_id: form.email_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FormView<'a> {
    values: &'a FormValues,
    success: bool,
    error: Option<&'a str>,
    max_image_bytes: usize,
}

#[derive(Debug, Serialize)]
struct SchoolCard<'a> {
    id: i64,
    name: &'a str,
    address: &'a str,
    city: &'a str,
    state: &'a str,
    contact: &'a str,
    email_id: &'a str,
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListingView<'a> {
    schools: Vec<SchoolCard<'a>>,
    count: usize,
    error: Option<&'a str>,
    placeholder: &'static str,
}

impl Pages {
    pub fn new(image_prefix: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();

        registry.register_partial("nav", include_str!("../templates/nav.hbs"))?;
        registry.register_template_string("home", include_str!("../templates/home.hbs"))?;
        registry.register_template_string(
            "add_school",
            include_str!("../templates/add_school.hbs"),
        )?;
        registry.register_template_string("schools", include_str!("../templates/schools.hbs"))?;

        Ok(Self {
            registry,
            image_prefix: image_prefix.to_string(),
        })
    }

    pub fn render_home(&self) -> Result<String, RenderError> {
        self.registry.render("home", &serde_json::json!({}))
    }

    pub fn render_form(
        &self,
        values: &FormValues,
        success: bool,
        error: Option<&str>,
    ) -> Result<String, RenderError> {
        self.registry.render(
            "add_school",
            &FormView {
                values,
                success,
                error,
                max_image_bytes: MAX_IMAGE_BYTES,
            },
        )
    }

    pub fn render_listing(&self, schools: &[School]) -> Result<String, RenderError> {
        let cards: Vec<_> = schools
            .iter()
            .map(|s| SchoolCard {
                id: s.id,
                name: &s.name,
                address: &s.address,
                city: &s.city,
                state: &s.state,
                contact: &s.contact,
                email_id: &s.email_id,
                image_url: s
                    .image
                    .as_deref()
                    .and_then(|r| resolve_image_url(r, &self.image_prefix)),
            })
            .collect();

        self.registry.render(
            "schools",
            &ListingView {
                count: cards.len(),
                schools: cards,
                error: None,
                placeholder: PLACEHOLDER_PATH,
            },
        )
    }

    pub fn render_listing_error(&self, message: &str) -> Result<String, RenderError> {
        self.registry.render(
            "schools",
            &ListingView {
                schools: Vec::new(),
                count: 0,
                error: Some(message),
                placeholder: PLACEHOLDER_PATH,
            },
        )
    }
}

fn html(status: StatusCode, rendered: Result<String, RenderError>) -> Response {
    match rendered {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!(operation = "render_page", error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

pub async fn home_page(State(state): State<AppState>) -> Response {
    html(StatusCode::OK, state.pages.render_home())
}

pub async fn add_school_page(State(state): State<AppState>) -> Response {
    html(
        StatusCode::OK,
        state.pages.render_form(&FormValues::default(), false, None),
    )
}

/// Form post: registers the school and re-renders the form with the outcome
pub async fn submit_school_page(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_school_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            return html(
                e.status_code(),
                state
                    .pages
                    .render_form(&FormValues::default(), false, Some(&e.public_message())),
            )
        }
    };

    let values = FormValues::from(&form);

    match state.service.register(form).await {
        Ok(_) => html(
            StatusCode::OK,
            state.pages.render_form(&FormValues::default(), true, None),
        ),
        Err(e) => form_error(&state, &values, &e),
    }
}

fn form_error(state: &AppState, values: &FormValues, e: &SchoolError) -> Response {
    html(
        e.status_code(),
        state
            .pages
            .render_form(values, false, Some(&e.public_message())),
    )
}

pub async fn schools_page(State(state): State<AppState>) -> Response {
    match state.service.list().await {
        Ok(schools) => html(StatusCode::OK, state.pages.render_listing(&schools)),
        Err(_) => html(
            StatusCode::INTERNAL_SERVER_ERROR,
            state
                .pages
                .render_listing_error("Failed to load schools. Please try again later."),
        ),
    }
}

pub async fn placeholder_image() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        PLACEHOLDER_SVG,
    )
}
