//! Request handlers for the web form.

use super::render::{markdown_to_html, page};
use super::AppState;
use crate::convert::convert;
use crate::error::Doc2MdError;
use crate::pipeline::media::{absolutize_image_links, inline_images};
use crate::pipeline::pandoc::check_pandoc;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What the form submitted.
#[derive(Debug, Default)]
struct ConvertForm {
    file_name: Option<String>,
    file_bytes: Vec<u8>,
    output_dir: Option<String>,
    inline_images: bool,
    caption_images: bool,
}

/// `GET /`: the upload form.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page(&state.default_output_dir, None, None))
}

/// `POST /convert`: save the upload, convert it, show the status and preview.
pub async fn convert_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let render_error = |status: StatusCode, message: &str| {
        (
            status,
            Html(page(&state.default_output_dir, Some((message, true)), None)),
        )
    };

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(message) => return render_error(StatusCode::BAD_REQUEST, &message),
    };
    let Some(file_name) = form.file_name.as_deref() else {
        return render_error(StatusCode::BAD_REQUEST, "Please upload a document to convert.");
    };

    let output_dir = match form.output_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => state.default_output_dir.clone(),
    };

    // The upload keeps its original name so the Markdown file is named after it.
    let upload_dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to create upload directory: {}", e);
            return render_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Error occurred during conversion: {e}"),
            );
        }
    };
    let upload_path = upload_dir.path().join(sanitize_file_name(file_name));
    if let Err(e) = tokio::fs::write(&upload_path, &form.file_bytes).await {
        error!("Failed to save upload {}: {}", upload_path.display(), e);
        return render_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Error occurred during conversion: {e}"),
        );
    }

    let mut config = (*state.config).clone();
    config.caption_images = form.caption_images;
    config.progress_callback = None;

    info!(
        "Web conversion: {} → {} (inline={}, caption={})",
        file_name,
        output_dir.display(),
        form.inline_images,
        form.caption_images
    );

    let result = {
        let _guard = state.conversion_lock.lock().await;
        convert(&upload_path, &output_dir, &config).await
    };

    match result {
        Ok(output) => {
            let base_dir = output
                .markdown_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| output_dir.clone());
            let preview_markdown = if form.inline_images {
                inline_images(&output.markdown, &base_dir)
            } else {
                absolutize_image_links(&output.markdown, &base_dir)
            };
            let status = format!(
                "Success! Converted file saved to:\nMarkdown: {}\nMedia: {}",
                output.markdown_path.display(),
                output.media_dir.display()
            );
            let preview = markdown_to_html(&preview_markdown);
            (
                StatusCode::OK,
                Html(page(
                    &state.default_output_dir,
                    Some((&status, false)),
                    Some(&preview),
                )),
            )
        }
        Err(e) => {
            warn!("Web conversion of {} failed: {}", file_name, e);
            render_error(status_for(&e), &failure_message(&e))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `pandoc --version` first line, `None` when pandoc is unavailable.
    pub pandoc: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pandoc = check_pandoc(&state.config.pandoc_path).await.ok();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pandoc,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────

async fn read_form(mut multipart: Multipart) -> Result<ConvertForm, String> {
    let mut form = ConvertForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid form submission: {}", e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Upload failed: {}", e.body_text()))?;
                if file_name.is_some() {
                    form.file_name = file_name;
                    form.file_bytes = bytes.to_vec();
                }
            }
            "output_dir" => {
                form.output_dir = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| format!("Invalid output directory: {}", e.body_text()))?,
                );
            }
            "inline_images" => form.inline_images = checkbox(field.text().await.ok()),
            "caption_images" => form.caption_images = checkbox(field.text().await.ok()),
            other => warn!("Ignoring unknown form field '{}'", other),
        }
    }
    Ok(form)
}

/// Browsers send "on" for a ticked checkbox and omit it otherwise.
fn checkbox(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("on" | "true" | "1" | "yes")
    )
}

/// Keep only the final path component of an uploaded file name.
fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => "upload".to_string(),
        name => name.to_string(),
    }
}

/// The status line shown for a failed conversion.
fn failure_message(e: &Doc2MdError) -> String {
    match e {
        Doc2MdError::ConversionFailed { message, .. } => format!("Conversion failed: {message}"),
        other => format!("Error occurred during conversion: {other}"),
    }
}

fn status_for(e: &Doc2MdError) -> StatusCode {
    match e {
        Doc2MdError::FileNotFound { .. }
        | Doc2MdError::PermissionDenied { .. }
        | Doc2MdError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        Doc2MdError::ConversionFailed { .. }
        | Doc2MdError::CorruptPdf { .. }
        | Doc2MdError::PasswordRequired { .. }
        | Doc2MdError::WrongPassword { .. }
        | Doc2MdError::ImageExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Doc2MdError::ToolMissing { .. } | Doc2MdError::ProviderNotConfigured { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Doc2MdError::OutputWriteFailed { .. }
        | Doc2MdError::OutputReadFailed { .. }
        | Doc2MdError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("report.docx"), "report.docx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\deck.pptx"), "deck.pptx");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
    }

    #[test]
    fn checkbox_values() {
        assert!(checkbox(Some("on".into())));
        assert!(checkbox(Some("true".into())));
        assert!(!checkbox(Some("off".into())));
        assert!(!checkbox(None));
    }

    #[test]
    fn failure_messages() {
        let failed = Doc2MdError::ConversionFailed {
            tool: "pandoc".into(),
            message: "Unknown input format xyz".into(),
        };
        assert_eq!(failure_message(&failed), "Conversion failed: Unknown input format xyz");

        let missing = Doc2MdError::ToolMissing {
            tool: "pandoc".into(),
            hint: "install it".into(),
        };
        assert!(failure_message(&missing).starts_with("Error occurred during conversion: "));
        assert_eq!(status_for(&missing), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&failed), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
