//! JSON-over-HTTP plumbing shared by the provider clients.
//!
//! One [`JsonEndpoint`] per provider route: it owns the configured client and
//! turns non-2xx statuses, undecodable bodies and blank completions into
//! [`ProviderError`]s, so the clients only describe their payloads.

use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{
    AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
};

/// Applied when a profile sets no `timeout_secs`.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug)]
pub(crate) struct JsonEndpoint {
    provider: Provider,
    client: reqwest::Client,
    url: String,
}

impl JsonEndpoint {
    /// Endpoint for `{cfg.endpoint}{route}`.
    ///
    /// # Errors
    /// - `InvalidEndpoint` when the base URL is not http(s)
    /// - [`AiLlmError::HttpTransport`] when the client cannot be built
    pub(crate) fn new(
        provider: Provider,
        cfg: &LlmModelConfig,
        route: &str,
        headers: HeaderMap,
    ) -> Result<Self, AiLlmError> {
        let base = cfg.endpoint.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            provider,
            client,
            url: format!("{}{route}", base.trim_end_matches('/')),
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// POSTs `body` and decodes the 2xx answer as `R`.
    pub(crate) async fn post<B, R>(&self, body: &B) -> Result<R, AiLlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let resp = self.client.post(&self.url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(
                provider = %self.provider,
                %status,
                url = %self.url,
                %snippet,
                latency_ms = started.elapsed().as_millis() as u64,
                "completion request rejected"
            );
            return Err(ProviderError::new(
                self.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url: self.url.clone(),
                    snippet,
                }),
            )
            .into());
        }

        let out = resp.json::<R>().await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "undecodable completion body");
            ProviderError::new(self.provider, ProviderErrorKind::Decode(e.to_string()))
        })?;
        debug!(
            provider = %self.provider,
            latency_ms = started.elapsed().as_millis() as u64,
            "completion received"
        );
        Ok(out)
    }
}

/// The completion text, or `EmptyResponse` when it is missing or blank.
pub(crate) fn require_text(provider: Provider, text: Option<String>) -> Result<String, AiLlmError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::EmptyResponse).into())
}
