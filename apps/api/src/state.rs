use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::GenerativeModel;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds no per-request data; every generation request is independent.
#[derive(Clone)]
pub struct AppState {
    /// Text-generation backend. `GeminiClient` in production.
    pub llm: Arc<dyn GenerativeModel>,
    pub config: Config,
}
