#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use schools_service::{
    create_router, AppState, Config, MemorySchoolStore, Pages, SchoolService, StorageResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "schools-test-boundary-7MA4YWxkTrZu0gW";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemorySchoolStore>,
    pub image_dir: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    /// App with local storage only
    pub async fn local_only() -> Self {
        Self::build(None, 5).await
    }

    /// App whose Cloudinary API lives at `base_url`
    pub async fn with_cloudinary(base_url: &str) -> Self {
        Self::build(Some(base_url), 5).await
    }

    /// Same, with a custom upload timeout
    pub async fn with_cloudinary_timeout(base_url: &str, timeout_secs: u64) -> Self {
        Self::build(Some(base_url), timeout_secs).await
    }

    async fn build(cloudinary_base: Option<&str>, timeout_secs: u64) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let image_dir = tmp.path().join("schoolImages");

        let mut config = Config::default();
        config.local_storage.directory = image_dir.to_string_lossy().into_owned();
        if let Some(base) = cloudinary_base {
            config.cloudinary.cloud_name = Some("demo".to_string());
            config.cloudinary.api_key = Some("1234567890".to_string());
            config.cloudinary.api_secret = Some("test-secret".to_string());
            config.cloudinary.api_base_url = base.to_string();
            config.cloudinary.timeout_secs = timeout_secs;
        }

        let store = Arc::new(MemorySchoolStore::new());
        let images = StorageResolver::from_config(&config).await.unwrap();
        let state = AppState {
            service: SchoolService::new(store.clone(), images),
            pages: Arc::new(Pages::new(&config.local_storage.public_prefix).unwrap()),
        };

        Self {
            router: create_router(state, &config.api, &config.local_storage),
            store,
            image_dir,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &FormBuilder) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(form.build()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
    }

    /// Files currently in the local image directory
    pub fn stored_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.image_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Multipart body builder
#[derive(Default, Clone)]
pub struct FormBuilder {
    fields: Vec<(String, String)>,
    image: Option<(String, String, Vec<u8>)>,
}

impl FormBuilder {
    pub fn valid() -> Self {
        Self::default()
            .field("name", "Delhi Public School")
            .field("address", "Mathura Road, Sector 4")
            .field("city", "New Delhi")
            .field("state", "Delhi")
            .field("contact", "9811122233")
            .field("email_id", "  Principal@DPS.edu.in ")
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self
    }

    pub fn image(mut self, file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        self.image = Some((file_name.to_string(), content_type.to_string(), data));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();

        for (name, value) in &self.fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }

        if let Some((file_name, content_type, data)) = &self.image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file_name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Deterministic pseudo-image bytes of the given size
pub fn image_bytes(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
    if len >= 8 {
        data[..8].copy_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
    data
}

/// Base URL of a server that accepts connections and never replies
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
