//! Axum route handlers for the question generation API.

use std::path::{Path, PathBuf};

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract_resume_text, preview, PREVIEW_CHARS};
use crate::questions::export::{render_transcript, transcript_file_name};
use crate::questions::generator::{generate_questions, resolve_count, GeneratedQuestions};
use crate::questions::parser::QuestionAnswer;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFromTextRequest {
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub questions: Vec<QuestionAnswer>,
    #[serde(default)]
    pub source_name: Option<String>,
}

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/upload-and-generate
///
/// Multipart upload: field `file` carries the resume PDF, optional field
/// `count` overrides the configured number of questions.
pub async fn handle_upload_and_generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GeneratedQuestions>, AppError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "upload-and-generate called");

    let limit_bytes = state.config.max_upload_bytes;
    let mut upload: Option<UploadedFile> = None;
    let mut requested_count: Option<u32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, limit_bytes))?;
                upload = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "count" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, limit_bytes))?;
                let count = raw.trim().parse::<u32>().map_err(|_| {
                    AppError::Validation(format!("count must be a positive integer, got '{raw}'"))
                })?;
                requested_count = Some(count);
            }
            other => debug!(%request_id, "Ignoring multipart field '{other}'"),
        }
    }

    let Some(upload) = upload else {
        warn!(%request_id, "No file field in multipart body");
        return Err(AppError::MissingFile);
    };

    info!(
        %request_id,
        file_name = %upload.file_name,
        content_type = upload.content_type.as_deref().unwrap_or("unknown"),
        size = upload.data.len(),
        "Received resume upload"
    );

    if let Some(dir) = &state.config.debug_upload_dir {
        match save_debug_copy(dir, &upload.file_name, &upload.data).await {
            Ok(path) => info!(%request_id, "Saved uploaded PDF to {}", path.display()),
            Err(e) => warn!(%request_id, "Could not save debug copy of upload: {e}"),
        }
    }

    let count = resolve_count(requested_count, state.config.question_count)?;

    let resume_text = extract_resume_text(upload.data).await?;
    info!(%request_id, chars = resume_text.len(), "Resume text extracted");
    info!(%request_id, "Resume preview: {}", preview(&resume_text, PREVIEW_CHARS));

    let generated = generate_questions(state.llm.as_ref(), &resume_text, count).await?;
    info!(
        %request_id,
        questions = generated.questions.len(),
        model = %generated.model_used,
        "Questions generated"
    );

    Ok(Json(generated))
}

/// POST /api/generate-questions
///
/// Accepts `{"resumeText": "...", "count"?: n}` for clients that already
/// have the resume as text.
pub async fn handle_generate_from_text(
    State(state): State<AppState>,
    payload: Result<Json<GenerateFromTextRequest>, JsonRejection>,
) -> Result<Json<GeneratedQuestions>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e.body_text())))?;

    let resume_text = request
        .resume_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Missing resumeText in request body".to_string()))?;

    let count = resolve_count(request.count, state.config.question_count)?;
    info!(chars = resume_text.len(), count, "generate-questions called");

    let generated = generate_questions(state.llm.as_ref(), resume_text, count).await?;
    Ok(Json(generated))
}

/// POST /api/export
///
/// Renders a question set as a downloadable plain-text transcript.
pub async fn handle_export(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e.body_text())))?;

    if request.questions.is_empty() {
        return Err(AppError::Validation("No questions to export".to_string()));
    }

    let now = Utc::now();
    let source_name = request
        .source_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("resume");
    let body = render_transcript(source_name, &request.questions, now.date_naive());
    let file_name = transcript_file_name(now.timestamp_millis());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    ))
}

/// Keeps the body-limit rejection distinct from a badly formed request.
fn multipart_error(err: MultipartError, limit_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Rejected upload larger than {limit_bytes} bytes");
        AppError::UploadTooLarge { limit_bytes }
    } else {
        AppError::MalformedMultipart(err.body_text())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Debug copies
// ────────────────────────────────────────────────────────────────────────────

/// Final path component of a client-supplied name, restricted to `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

async fn save_debug_copy(dir: &Path, file_name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(file_name)
    ));
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("My Resume (final).pdf"), "My_Resume__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name(".."), "upload.pdf");
        assert_eq!(sanitize_file_name(""), "upload.pdf");
    }

    #[tokio::test]
    async fn test_save_debug_copy_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads_debug");

        let path = save_debug_copy(&nested, "cv.pdf", b"%PDF-1.4").await.unwrap();

        assert!(path.starts_with(&nested));
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("-cv.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
    }
}
