//! Router tests for the web form, driven with `tower::ServiceExt::oneshot`.

#![cfg(feature = "server")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use edgequake_doc2md::server::{create_router, AppState};
use edgequake_doc2md::ConversionConfig;
use std::path::Path;
use tower::ServiceExt;

const BOUNDARY: &str = "doc2md-test-boundary";

fn state(pandoc: &str, output_dir: &Path) -> AppState {
    let config = ConversionConfig::builder()
        .pandoc_path(pandoc)
        .build()
        .unwrap();
    AppState::new(config, output_dir)
}

/// Build a multipart body. `file` is `(file name, bytes)`; text fields follow.
fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn convert_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state("pandoc", &dir.path().join("converted_documents")));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"enctype="multipart/form-data""#));
    assert!(html.contains(r#"name="file""#));
    assert!(html.contains(r#"name="output_dir""#));
    assert!(html.contains(r#"name="inline_images""#));
    assert!(html.contains(r#"name="caption_images""#));
    assert!(html.contains("converted_documents"));
}

#[tokio::test]
async fn test_health_reports_missing_pandoc() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state("/no/such/pandoc", dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["pandoc"].is_null());
}

#[tokio::test]
async fn test_convert_without_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state("pandoc", dir.path()));

    let body = multipart_body(None, &[("output_dir", "")]);
    let response = app.oneshot(convert_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Please upload a document"));
}

#[tokio::test]
async fn test_convert_reports_missing_tool() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let app = create_router(state("/no/such/pandoc", &out));

    let body = multipart_body(Some(("notes.txt", b"hello")), &[]);
    let response = app.oneshot(convert_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let html = body_text(response).await;
    assert!(html.contains("Error occurred during conversion: Required tool 'pandoc'"));
    assert!(!out.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_convert_success_with_inlined_preview() {
    let dir = tempfile::tempdir().unwrap();
    let pandoc = common::fake_pandoc(dir.path());
    let default_out = dir.path().join("default_out");
    let chosen_out = dir.path().join("chosen");
    let app = create_router(state(&pandoc.to_string_lossy(), &default_out));

    let out_field = chosen_out.to_string_lossy().into_owned();
    let body = multipart_body(
        Some(("guide.docx", b"PK\x03\x04")),
        &[("output_dir", out_field.as_str()), ("inline_images", "on")],
    );
    let response = app.oneshot(convert_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    let markdown_path = chosen_out.join("guide.md");
    assert!(html.contains("Success! Converted file saved to:"));
    assert!(html.contains(&format!("Markdown: {}", markdown_path.display())));
    assert!(html.contains(&format!("Media: {}", chosen_out.join("guide_media").display())));
    assert!(html.contains("<h1>Setup guide</h1>"));
    assert!(html.contains("data:image/png;base64,UE5H"));

    assert!(markdown_path.is_file());
    assert!(!default_out.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_convert_failure_shows_tool_message() {
    let dir = tempfile::tempdir().unwrap();
    let pandoc = common::fake_pandoc(dir.path());
    let out = dir.path().join("out");
    let app = create_router(state(&pandoc.to_string_lossy(), &out));

    let body = multipart_body(Some(("broken.xyz", b"???")), &[]);
    let response = app.oneshot(convert_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response)
        .await
        .contains("Conversion failed: Unknown input format broken"));
}
