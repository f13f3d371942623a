//! Question generation: orchestrates one request through the model.
//!
//! Flow: build prompt → model call (retry + fallback inside llm_client) →
//!       locate candidate text → extract JSON array → normalize pairs.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ARRAY_ONLY, JSON_ESCAPING_RULES};
use crate::llm_client::GenerativeModel;
use crate::questions::parser::{extract_json_array, into_question_answers, QuestionAnswer};
use crate::questions::prompts::QUESTIONS_PROMPT_TEMPLATE;

/// How much of the raw API body is logged on every call.
const RAW_PREVIEW_CHARS: usize = 3000;

/// Upper bound accepted for a requested question count.
pub const MAX_QUESTION_COUNT: u32 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestions {
    pub questions: Vec<QuestionAnswer>,
    pub model_used: String,
}

/// Checks a client-supplied count, falling back to `default` when absent.
pub fn resolve_count(requested: Option<u32>, default: u32) -> Result<u32, AppError> {
    match requested {
        None => Ok(default),
        Some(n) if (1..=MAX_QUESTION_COUNT).contains(&n) => Ok(n),
        Some(n) => Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_QUESTION_COUNT}, got {n}"
        ))),
    }
}

pub fn build_prompt(resume_text: &str, count: u32) -> String {
    QUESTIONS_PROMPT_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{json_array_only}", JSON_ARRAY_ONLY)
        .replace("{escaping_rules}", JSON_ESCAPING_RULES)
        .replace("{resume_text}", resume_text)
}

/// Generates `count` question/answer pairs for a resume.
///
/// The count is a request to the model, not a guarantee; a mismatch is logged
/// and the pairs are returned as parsed.
pub async fn generate_questions(
    model: &dyn GenerativeModel,
    resume_text: &str,
    count: u32,
) -> Result<GeneratedQuestions, AppError> {
    let prompt = build_prompt(resume_text, count);
    let reply = model.generate(&prompt).await?;

    info!(
        model = %reply.model_used,
        status = reply.status,
        "Model replied"
    );
    debug!(
        "Raw API response (preview): {}",
        reply
            .body
            .to_string()
            .chars()
            .take(RAW_PREVIEW_CHARS)
            .collect::<String>()
    );

    let Some(text) = reply.text() else {
        error!(
            "No candidate text in model response: {}",
            serde_json::to_string_pretty(&reply.body).unwrap_or_default()
        );
        return Err(AppError::EmptyModelOutput);
    };

    let values = extract_json_array(text)?;
    let parsed_items = values.len();
    let questions = into_question_answers(values);

    if questions.is_empty() {
        warn!("Model returned {parsed_items} items but none were question/answer pairs");
        return Err(AppError::NoQuestions);
    }
    if questions.len() != count as usize {
        warn!(
            "Requested {count} questions, model produced {}",
            questions.len()
        );
    }

    Ok(GeneratedQuestions {
        questions,
        model_used: reply.model_used,
    })
}
