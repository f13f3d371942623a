// Shared prompt fragments. Each service that calls the model keeps its own
// prompts.rs alongside it and pulls cross-cutting instructions from here.

/// Output contract for prompts that expect a bare JSON array back.
pub const JSON_ARRAY_ONLY: &str = "IMPORTANT: Return ONLY a single JSON array \
    (no surrounding text, no markdown, no backticks)";

/// Escaping rules the model tends to ignore; the parser repairs what slips through.
pub const JSON_ESCAPING_RULES: &str = "Escape internal double quotes as \\\" and \
    backslashes as \\\\. Replace literal newlines in answers with \\n.";
