// Prompt constants for interview question generation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Question generation prompt. Replace `{count}`, `{json_array_only}` and
/// `{escaping_rules}` first and `{resume_text}` last, so resume content is
/// never treated as a placeholder.
pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"You are an AI interview assistant. Based on the resume below, generate exactly {count} interview questions with detailed answers.
{json_array_only} in this exact format:
[
  {"question":"Question text","answer":"Detailed answer"}
]
{escaping_rules}

Resume:
{resume_text}"#;
