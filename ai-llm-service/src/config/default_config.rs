//! Default LLM configs loaded from environment variables.
//!
//! Two profiles exist, one per review purpose:
//!
//! - **Review**  → compliance review of document text (long output, low temperature)
//! - **Summary** → short document summary
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = `openai` (default) or `ollama`
//! - `LLM_TIMEOUT_SECS`  = optional request timeout (u64)
//!
//! OpenAI:
//! - `OPENAI_API_KEY`        (required)
//! - `OPENAI_URL`            (default `https://api.openai.com`)
//! - `OPENAI_REVIEW_MODEL`   (default `gpt-4.1-mini`)
//! - `OPENAI_SUMMARY_MODEL`  (default `gpt-4`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (required)
//! - `OLLAMA_MODEL`                (required; review model)
//! - `OLLAMA_SUMMARY_MODEL`        (optional; falls back to `OLLAMA_MODEL`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, must_var, opt_u64, opt_var, validate_http_endpoint,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_REVIEW_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_OPENAI_SUMMARY_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Review and summary profiles resolved from one environment.
#[derive(Debug, Clone)]
pub struct ProfileConfigs {
    pub review: LlmModelConfig,
    pub summary: LlmModelConfig,
}

/// Loads both profiles from the process environment.
///
/// # Errors
/// See [`profiles_from_lookup`].
pub fn profiles_from_env() -> Result<ProfileConfigs, AiLlmError> {
    profiles_from_lookup(|k| std::env::var(k).ok())
}

/// Loads both profiles through an arbitrary variable lookup.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::MissingVar`] when a required variable is absent
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::InvalidFormat`] for malformed values
pub fn profiles_from_lookup<F>(lookup: F) -> Result<ProfileConfigs, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = match opt_var(&lookup, "LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::OpenAI,
    };
    let timeout_secs = Some(opt_u64(&lookup, "LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let (endpoint, api_key, review_model, summary_model) = match provider {
        LlmProvider::OpenAI => {
            let api_key = must_var(&lookup, "OPENAI_API_KEY")?;
            let endpoint =
                opt_var(&lookup, "OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            validate_http_endpoint("OPENAI_URL", &endpoint)?;
            let review = opt_var(&lookup, "OPENAI_REVIEW_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_REVIEW_MODEL.to_string());
            let summary = opt_var(&lookup, "OPENAI_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_SUMMARY_MODEL.to_string());
            (endpoint, Some(api_key), review, summary)
        }
        LlmProvider::Ollama => {
            let endpoint = ollama_endpoint(&lookup)?;
            let review = must_var(&lookup, "OLLAMA_MODEL")?;
            let summary = opt_var(&lookup, "OLLAMA_SUMMARY_MODEL").unwrap_or_else(|| review.clone());
            (endpoint, None, review, summary)
        }
    };

    Ok(ProfileConfigs {
        review: LlmModelConfig {
            provider,
            model: review_model,
            endpoint: endpoint.clone(),
            api_key: api_key.clone(),
            max_tokens: Some(4192),
            temperature: Some(0.2),
            timeout_secs,
        },
        summary: LlmModelConfig {
            provider,
            model: summary_model,
            endpoint,
            api_key,
            max_tokens: Some(500),
            temperature: Some(0.3),
            timeout_secs,
        },
    })
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint<F>(lookup: &F) -> Result<String, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = opt_var(lookup, "OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_var(lookup, "OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}
