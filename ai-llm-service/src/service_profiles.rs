//! Shared LLM service with two profiles: `review` and `summary`.
//!
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches provider clients per full config, so a summary profile that falls
//!   back to the review profile reuses its HTTP client.
//! - Dispatch is enum-based; no trait objects.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::config::default_config::profiles_from_env;
//! use ai_llm_service::{LlmServiceProfiles, Purpose};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfgs = profiles_from_env()?;
//! let svc = Arc::new(LlmServiceProfiles::new(cfgs.review, Some(cfgs.summary)));
//! let text = svc
//!     .generate(Purpose::Summary, "Summarize: ...", Some("You summarize documents."))
//!     .await?;
//! println!("{text}");
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// What a completion request is for; selects the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Compliance review of document text.
    Review,
    /// Document summary.
    Summary,
}

/// Service holding the `review` and `summary` profiles.
pub struct LlmServiceProfiles {
    review: LlmModelConfig,
    summary: LlmModelConfig,
    clients: RwLock<HashMap<ClientKey, ProviderClient>>,
}

impl LlmServiceProfiles {
    /// Creates a new service.
    ///
    /// - `review`: required review profile.
    /// - `summary_opt`: optional summary profile; falls back to `review`.
    pub fn new(review: LlmModelConfig, summary_opt: Option<LlmModelConfig>) -> Self {
        let summary = summary_opt.unwrap_or_else(|| review.clone());
        Self {
            review,
            summary,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Generates text with the profile selected by `purpose`.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the client cannot be built or generation fails.
    pub async fn generate(
        &self,
        purpose: Purpose,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        let cfg = self.profile(purpose);
        debug!(?purpose, model = %cfg.model, "dispatching completion");
        match self.get_or_init(cfg).await? {
            ProviderClient::OpenAi(cli) => cli.generate(prompt, system).await,
            ProviderClient::Ollama(cli) => cli.generate(prompt, system).await,
        }
    }

    /// Returns the config used for `purpose`.
    pub fn profile(&self, purpose: Purpose) -> &LlmModelConfig {
        match purpose {
            Purpose::Review => &self.review,
            Purpose::Summary => &self.summary,
        }
    }

    /* --------------------- Internals --------------------- */

    async fn get_or_init(&self, cfg: &LlmModelConfig) -> Result<ProviderClient, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }

        let fresh = match cfg.provider {
            LlmProvider::OpenAI => ProviderClient::OpenAi(Arc::new(OpenAiService::new(cfg.clone())?)),
            LlmProvider::Ollama => ProviderClient::Ollama(Arc::new(OllamaService::new(cfg.clone())?)),
        };

        let mut w = self.clients.write().await;
        Ok(w.entry(key).or_insert(fresh).clone())
    }
}

#[derive(Clone)]
enum ProviderClient {
    OpenAi(Arc<OpenAiService>),
    Ollama(Arc<OllamaService>),
}

/// Cache key identifying a unique client config.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
    max_tokens: Option<u32>,
    temperature_bits: Option<u32>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
            max_tokens: cfg.max_tokens,
            temperature_bits: cfg.temperature.map(f32::to_bits),
        }
    }
}
