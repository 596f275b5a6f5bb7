//! LLM Client: the single point of entry for all language-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call a provider API directly.
//! The judge and classifier reach providers only through [`LlmProvider`].
//!
//! Three backends are supported: Anthropic Messages, Google Gemini
//! `generateContent`, and a local Ollama server. Each is enabled when its
//! settings are present.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ProviderSettings;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

const MAX_RETRIES: u32 = 3;
/// Transport-level ceiling; the judge applies its own (usually shorter) deadline.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A language-model backend that turns (system, prompt) into text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable provider name used in `JUDGE_PROVIDERS` and in results.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Builds every provider whose settings are present.
pub fn build_providers(settings: &ProviderSettings) -> Result<Vec<Arc<dyn LlmProvider>>, LlmError> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    if let Some(key) = &settings.anthropic_api_key {
        providers.push(Arc::new(AnthropicProvider::new(key.clone())?));
        info!("LLM provider enabled: anthropic (model: {})", anthropic::MODEL);
    }
    if let Some(key) = &settings.gemini_api_key {
        providers.push(Arc::new(GeminiProvider::new(
            key.clone(),
            settings.gemini_model.clone(),
        )?));
        info!("LLM provider enabled: gemini (model: {})", settings.gemini_model);
    }
    if let Some(base_url) = &settings.ollama_base_url {
        providers.push(Arc::new(OllamaProvider::new(
            base_url.clone(),
            settings.ollama_model.clone(),
        )?));
        info!("LLM provider enabled: ollama (model: {})", settings.ollama_model);
    }

    if providers.is_empty() {
        warn!("No LLM provider configured; classification and evaluation will fail");
    }
    Ok(providers)
}

pub(crate) fn http_client() -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

/// Sends a request built by `build`, retrying on 429 and 5xx with exponential
/// backoff (1s, 2s). Any other non-success status is returned immediately.
pub(crate) async fn send_with_retry(
    provider: &str,
    build: impl Fn() -> RequestBuilder,
) -> Result<Response, LlmError> {
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "{provider} call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("{provider} API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: MAX_RETRIES,
    }))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Finds the JSON object in a model reply: a fenced block anywhere in the
/// text, else the outermost `{...}` span.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let fenced = strip_json_fences(&text[start..]);
        let fenced = fenced.split("```").next().unwrap_or(fenced).trim();
        if fenced.starts_with('{') {
            return Some(fenced);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_from_fence_after_prose() {
        let input = "Here is my evaluation:\n```json\n{\"a\": 1}\n```\nThanks!";
        assert_eq!(extract_json_object(input), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_outermost_braces() {
        let input = "Sure. {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_json_object(input), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_extract_json_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
