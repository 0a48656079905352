//! Ollama client for review and summary prompts.
//!
//! Uses `/api/generate` without streaming; the system instruction travels in
//! Ollama's top-level `system` field and the profile limits in `options`.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::transport::{JsonEndpoint, require_text};
use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};

const ROUTE: &str = "/api/generate";

#[derive(Debug)]
pub struct OllamaService {
    endpoint: JsonEndpoint,
    cfg: LlmModelConfig,
}

impl OllamaService {
    /// # Errors
    /// - `InvalidProvider` / `InvalidEndpoint` provider errors
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        let endpoint = JsonEndpoint::new(Provider::Ollama, &cfg, ROUTE, HeaderMap::new())?;
        info!(model = %cfg.model, url = endpoint.url(), "Ollama client ready");
        Ok(Self { endpoint, cfg })
    }

    /// Sends one prompt (with an optional system instruction) and returns the reply text.
    ///
    /// # Errors
    /// Transport, HTTP status, decode and empty-completion failures.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let body = Generate {
            model: &self.cfg.model,
            prompt,
            system,
            stream: false,
            options: Limits {
                temperature: self.cfg.temperature,
                num_predict: self.cfg.max_tokens,
            },
        };
        let reply: Generated = self.endpoint.post(&body).await?;
        require_text(Provider::Ollama, Some(reply.response))
    }
}

#[derive(Debug, Serialize)]
struct Generate<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Limits,
}

#[derive(Debug, Serialize)]
struct Limits {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Generated {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(provider: LlmProvider) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: "qwen3:14b".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: Some(500),
            temperature: Some(0.3),
            timeout_secs: None,
        }
    }

    #[test]
    fn summary_limits_go_into_options() {
        let body = Generate {
            model: "qwen3:14b",
            prompt: "Summarize",
            system: Some("Be brief."),
            stream: false,
            options: Limits {
                temperature: None,
                num_predict: Some(500),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system"], "Be brief.");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 500);
        assert!(json["options"].get("temperature").is_none());
    }

    #[test]
    fn rejects_wrong_provider() {
        assert!(OllamaService::new(profile(LlmProvider::OpenAI)).is_err());
        assert!(OllamaService::new(profile(LlmProvider::Ollama)).is_ok());
    }
}
