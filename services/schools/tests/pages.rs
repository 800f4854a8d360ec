mod support;

use axum::http::{header, StatusCode};
use support::{body_text, image_bytes, FormBuilder, TestApp};

#[tokio::test]
async fn test_home_and_form_pages_render() {
    let app = TestApp::local_only().await;

    let home = app.get("/").await;
    assert_eq!(home.status(), StatusCode::OK);
    let html = body_text(home).await;
    assert!(html.contains("href=\"/add-school\""));
    assert!(html.contains("href=\"/schools\""));

    let form = app.get("/add-school").await;
    assert_eq!(form.status(), StatusCode::OK);
    let html = body_text(form).await;
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(html.contains("accept=\"image/*\""));
}

#[tokio::test]
async fn test_form_post_success_shows_confirmation() {
    let app = TestApp::local_only().await;
    let form = FormBuilder::valid().image("front.png", "image/png", image_bytes(4096));

    let response = app.post_form("/add-school", &form).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("School added successfully!"));
    // Form is cleared after success
    assert!(!html.contains("value=\"Delhi Public School\""));

    assert_eq!(app.store.len().await, 1);
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_form_post_failure_keeps_values() {
    let app = TestApp::local_only().await;
    let form = FormBuilder::valid().field("contact", "12345");

    let response = app.post_form("/add-school", &form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("Contact must be a 10-digit number"));
    assert!(html.contains("value=\"Delhi Public School\""));
    assert!(html.contains("value=\"12345\""));
    assert!(!html.contains("School added successfully!"));
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_listing_empty_state() {
    let app = TestApp::local_only().await;

    let response = app.get("/schools").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No schools found"));
}

#[tokio::test]
async fn test_listing_shows_records_newest_first() {
    let app = TestApp::local_only().await;

    app.post_form("/api/schools", &FormBuilder::valid().field("name", "Older School"))
        .await;
    app.post_form(
        "/api/schools",
        &FormBuilder::valid()
            .field("name", "Newer School")
            .image("newer.jpg", "image/jpeg", image_bytes(512)),
    )
    .await;

    let response = app.get("/schools").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let newer = html.find("Newer School").unwrap();
    let older = html.find("Older School").unwrap();
    assert!(newer < older);

    assert!(html.contains("src=\"/schoolImages/school-"));
    assert!(html.contains("/static/school-placeholder.svg"));
    assert!(html.contains("mailto:principal@dps.edu.in"));
}

#[tokio::test]
async fn test_placeholder_image_served() {
    let app = TestApp::local_only().await;

    let response = app.get("/static/school-placeholder.svg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    assert!(body_text(response).await.contains("<svg"));
}
