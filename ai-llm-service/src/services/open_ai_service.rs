//! OpenAI chat-completions client for review and summary prompts.
//!
//! A request is the system instruction plus the document prompt as one user
//! message; the answer is the first non-blank choice.

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::transport::{JsonEndpoint, require_text};
use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};

const ROUTE: &str = "/v1/chat/completions";

#[derive(Debug)]
pub struct OpenAiService {
    endpoint: JsonEndpoint,
    cfg: LlmModelConfig,
}

impl OpenAiService {
    /// # Errors
    /// - `InvalidProvider` / `MissingApiKey` / `InvalidEndpoint` provider errors
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let reject = |kind| AiLlmError::from(ProviderError::new(Provider::OpenAI, kind));
        if cfg.provider != LlmProvider::OpenAI {
            return Err(reject(ProviderErrorKind::InvalidProvider));
        }
        let key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| reject(ProviderErrorKind::MissingApiKey))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| reject(ProviderErrorKind::MissingApiKey))?;
        headers.insert(header::AUTHORIZATION, bearer);

        let endpoint = JsonEndpoint::new(Provider::OpenAI, &cfg, ROUTE, headers)?;
        info!(model = %cfg.model, url = endpoint.url(), "OpenAI client ready");
        Ok(Self { endpoint, cfg })
    }

    /// Sends one prompt (with an optional system instruction) and returns the reply text.
    ///
    /// # Errors
    /// Transport, HTTP status, decode and empty-completion failures.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let body = Chat::new(&self.cfg, prompt, system);
        let reply: ChatReply = self.endpoint.post(&body).await?;
        require_text(Provider::OpenAI, reply.into_text())
    }
}

#[derive(Debug, Serialize)]
struct Chat<'a> {
    model: &'a str,
    messages: Vec<Turn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> Chat<'a> {
    fn new(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let system = system.map(|content| Turn { role: "system", content });
        let user = Turn { role: "user", content: prompt };
        Self {
            model: &cfg.model,
            messages: system.into_iter().chain(Some(user)).collect(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatReply {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .find(|c| !c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn review_profile() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4.1-mini".into(),
            endpoint: "https://api.openai.com/".into(),
            api_key: Some("sk-test".into()),
            max_tokens: Some(4192),
            temperature: Some(0.2),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn review_request_puts_instruction_before_document() {
        let cfg = review_profile();
        let body = Chat::new(&cfg, "Document: clause 1", Some("You are a compliance reviewer."));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Document: clause 1");
        assert_eq!(json["max_tokens"], 4192);
    }

    #[test]
    fn summary_request_without_instruction_has_one_turn() {
        let cfg = review_profile();
        let body = Chat::new(&cfg, "Summarize", None);
        assert_eq!(body.messages.len(), 1);
    }

    #[test]
    fn skips_blank_choices() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"  "}},{"message":{"content":"Clarity: vague"}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.into_text().as_deref(), Some("Clarity: vague"));
    }

    #[test]
    fn rejects_missing_key() {
        let mut cfg = review_profile();
        cfg.api_key = None;
        assert!(OpenAiService::new(cfg).is_err());
    }
}
