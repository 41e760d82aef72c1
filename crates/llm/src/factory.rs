//! LLM provider factory.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use scout_core::{AppError, AppResult, LlmSettings};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from settings.
///
/// # Errors
/// Returns `AppError::Llm` if the provider is unknown.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = settings
                .endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            let client = match settings.timeout_secs {
                Some(secs) => OllamaClient::with_timeout(base_url, Duration::from_secs(secs)),
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        other => Err(AppError::Llm(format!(
            "Unknown LLM provider: '{}'. Supported providers: ollama",
            other
        ))),
    }
}
