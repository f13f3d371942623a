//! Resume text extraction: pulls the embedded text layer out of an uploaded PDF.
//!
//! Only digital PDFs are supported. A scanned resume yields no text and is
//! reported as `ExtractionError::Empty`; OCR is out of scope.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of characters shown when logging a resume preview.
pub const PREVIEW_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    Pdf(String),

    #[error("PDF contains no extractable text")]
    Empty,
}

/// Extracts and trims the text of a PDF held in memory.
///
/// `pdf-extract` is synchronous and can panic on malformed input, so the call
/// runs on the blocking pool and a panic is reported as a parse failure.
pub async fn extract_resume_text(pdf: Bytes) -> Result<String, ExtractionError> {
    let size = pdf.len();
    let joined = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf)).await;

    let raw = match joined {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(ExtractionError::Pdf(e.to_string())),
        Err(join_err) => {
            warn!("PDF extractor aborted on a {size}-byte upload: {join_err}");
            return Err(ExtractionError::Pdf(
                "PDF extractor aborted while reading the document".to_string(),
            ));
        }
    };

    let text = raw.trim().to_string();
    debug!("Extracted {} chars from {size}-byte PDF", text.len());

    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

/// Whitespace-collapsed prefix of `text`, at most `max_chars` characters.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_test_pdf;

    #[tokio::test]
    async fn test_extracts_text_from_digital_pdf() {
        let pdf = make_test_pdf("Senior Rust Engineer");
        let text = extract_resume_text(Bytes::from(pdf)).await.unwrap();
        assert!(text.contains("Rust"), "unexpected extraction: {text:?}");
        assert_eq!(text, text.trim());
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_a_pdf_error() {
        let result = extract_resume_text(Bytes::from_static(b"definitely not a pdf")).await;
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }

    #[tokio::test]
    async fn test_pdf_without_text_is_empty() {
        let pdf = make_test_pdf("");
        let result = extract_resume_text(Bytes::from(pdf)).await;
        assert!(matches!(result, Err(ExtractionError::Empty)));
    }

    #[test]
    fn test_preview_collapses_whitespace_and_truncates() {
        let text = "Jane   Doe\n\nStaff Engineer\t at Acme";
        assert_eq!(preview(text, 100), "Jane Doe Staff Engineer at Acme");
        assert_eq!(preview(text, 8), "Jane Doe");
    }
}
