use crate::config::{ApiConfig, LocalStorageConfig};
use crate::error::SchoolError;
use crate::models::{ImageUpload, School, SchoolForm};
use crate::pages::{self, Pages, PLACEHOLDER_PATH};
use crate::registration::SchoolService;
use crate::validation::ValidationError;
use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: SchoolService,
    pub pages: Arc<Pages>,
}

/// Query parameters for delete
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

/// Create the HTTP router
pub fn create_router(state: AppState, api: &ApiConfig, local: &LocalStorageConfig) -> Router {
    let cors = if api.cors_enabled {
        if api.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = api
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    let image_prefix = format!("/{}", local.public_prefix.trim_matches('/'));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route(
            "/api/schools",
            get(list_schools).post(create_school).delete(delete_school),
        )
        .route("/", get(pages::home_page))
        .route(
            "/add-school",
            get(pages::add_school_page).post(pages::submit_school_page),
        )
        .route("/schools", get(pages::schools_page))
        .route(PLACEHOLDER_PATH, get(pages::placeholder_image))
        .nest_service(&image_prefix, ServeDir::new(&local.directory))
        .layer(DefaultBodyLimit::max(api.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Read a school submission from multipart form data.
///
/// Unknown fields are ignored. An `image` part without any bytes counts as no
/// image, which is what browsers send when no file was chosen.
pub async fn read_school_form(mut multipart: Multipart) -> Result<SchoolForm, SchoolError> {
    let mut form = SchoolForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(multipart_error)?;

            if !data.is_empty() {
                form.image = Some(ImageUpload::new(file_name, content_type, data));
            }
            continue;
        }

        let slot = match field_name.as_str() {
            "name" => &mut form.name,
            "address" => &mut form.address,
            "city" => &mut form.city,
            "state" => &mut form.state,
            "contact" => &mut form.contact,
            "email_id" | "email" => &mut form.email_id,
            _ => {
                debug!(field = %field_name, "Ignoring unknown form field");
                continue;
            }
        };

        *slot = field.text().await.map_err(multipart_error)?;
    }

    Ok(form)
}

/// Only an image can push a submission past the body limit, so that case is
/// reported as an oversized image.
fn multipart_error(e: MultipartError) -> SchoolError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SchoolError::Validation(ValidationError::ImageTooLarge)
    } else {
        SchoolError::InvalidForm(e.body_text())
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "schools-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => {
            error!(operation = "readiness", error = %e, "Record store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "database": "disconnected"
                })),
            )
        }
    }
}

/// All schools, most recent first
async fn list_schools(State(state): State<AppState>) -> Result<Json<Vec<School>>, SchoolError> {
    Ok(Json(state.service.list().await?))
}

/// Register a school from multipart form data
#[instrument(skip_all)]
async fn create_school(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<School>), SchoolError> {
    let form = read_school_form(multipart).await?;
    let school = state.service.register(form).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

/// Delete a school by `?id=`
#[instrument(skip(state))]
async fn delete_school(
    State(state): State<AppState>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, SchoolError> {
    let id = params
        .id
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or(SchoolError::InvalidId)?;

    state.service.delete(id).await?;

    Ok(Json(serde_json::json!({
        "message": "School deleted successfully",
        "id": id
    })))
}

/// Start the HTTP server and serve until `shutdown` resolves
pub async fn start_api_server(
    state: AppState,
    api: &ApiConfig,
    local: &LocalStorageConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(state, api, local);
    let addr = format!("{}:{}", api.host, api.port);

    info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}
