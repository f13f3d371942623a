// Interview question generation: prompt → model → lenient JSON parse.
// All model calls go through llm_client.

pub mod export;
pub mod generator;
pub mod handlers;
pub mod parser;
pub mod prompts;
