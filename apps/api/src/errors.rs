use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;
use crate::questions::parser::ParseFailure;

/// Longest extraction error detail returned to the client.
const MAX_DETAIL_CHARS: usize = 1000;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{"error": ..., "code": ..., "details"?: ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload exceeds the {limit_bytes}-byte limit")]
    UploadTooLarge { limit_bytes: usize },

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("PDF extraction failed: {0}")]
    PdfExtraction(String),

    #[error("PDF had no extractable text")]
    NoExtractableText,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("No text returned from model")]
    EmptyModelOutput,

    #[error("Could not parse questions from model output: {0}")]
    UnparsableOutput(#[from] ParseFailure),

    #[error("Model output contained no usable questions")]
    NoQuestions,
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Pdf(msg) => AppError::PdfExtraction(msg),
            ExtractionError::Empty => AppError::NoExtractableText,
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            AppError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "MISSING_FILE",
                "No file uploaded. Client must send FormData with field \"file\".".to_string(),
                None,
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::UploadTooLarge { limit_bytes } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE",
                format!("Upload exceeds the {limit_bytes}-byte limit"),
                None,
            ),
            AppError::MalformedMultipart(msg) => (
                StatusCode::BAD_REQUEST,
                "MALFORMED_MULTIPART",
                "Malformed multipart body".to_string(),
                Some(Value::String(msg.clone())),
            ),
            AppError::PdfExtraction(msg) => {
                tracing::error!("PDF extraction error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PDF_EXTRACTION_ERROR",
                    "Failed to extract text from PDF".to_string(),
                    Some(Value::String(msg.chars().take(MAX_DETAIL_CHARS).collect())),
                )
            }
            AppError::NoExtractableText => (
                StatusCode::BAD_REQUEST,
                "NO_EXTRACTABLE_TEXT",
                "PDF had no extractable text (may be a scanned image PDF). OCR required."
                    .to_string(),
                None,
            ),
            AppError::Llm(err) => {
                tracing::error!("LLM error: {err}");
                match err {
                    LlmError::Api {
                        model,
                        status,
                        message,
                    } => (
                        StatusCode::BAD_GATEWAY,
                        "LLM_API_ERROR",
                        format!("Model {model} rejected the request (status {status})"),
                        Some(Value::String(message.clone())),
                    ),
                    LlmError::Exhausted { .. } => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "LLM_UNAVAILABLE",
                        err.to_string(),
                        None,
                    ),
                    LlmError::MissingApiKey | LlmError::Client(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "LLM_ERROR",
                        err.to_string(),
                        None,
                    ),
                }
            }
            AppError::EmptyModelOutput => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "EMPTY_MODEL_OUTPUT",
                "No text returned from model".to_string(),
                Some(Value::String(
                    "See server logs for the raw model response".to_string(),
                )),
            ),
            AppError::UnparsableOutput(failure) => {
                tracing::error!("Parsing error: {failure:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNPARSABLE_MODEL_OUTPUT",
                    "Could not parse questions from model output".to_string(),
                    serde_json::to_value(failure).ok(),
                )
            }
            AppError::NoQuestions => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NO_QUESTIONS",
                "Parsed content contained no questions".to_string(),
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}
