use crate::config::llm_provider::LlmProvider;

/// Configuration for one model profile.
///
/// Both the review and summary profiles are described by this struct; only
/// generation parameters differ between them.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "gpt-4.1-mini".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: Some(4192),
///     temperature: Some(0.2),
///     timeout_secs: Some(120),
/// };
/// assert_eq!(cfg.provider, LlmProvider::OpenAI);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The backend serving this profile.
    pub provider: LlmProvider,

    /// Model identifier (e.g. `"gpt-4.1-mini"`, `"qwen3:14b"`).
    pub model: String,

    /// Base URL of the backend, without the API path.
    pub endpoint: String,

    /// API key for providers that require one (OpenAI).
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}
