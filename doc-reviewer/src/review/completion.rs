//! The completion-service seam.
//!
//! The pipeline only needs "system + prompt in, text out". Production uses
//! [`LlmServiceProfiles`]; tests plug in scripted fakes. Static dispatch only.

use std::future::Future;

use ai_llm_service::{LlmServiceProfiles, Purpose};

use crate::errors::CompletionError;

/// One request to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub purpose: Purpose,
    pub system: String,
    pub prompt: String,
}

/// Text-in/text-out language model.
pub trait CompletionService {
    fn complete(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

impl CompletionService for LlmServiceProfiles {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        let text = self
            .generate(req.purpose, &req.prompt, Some(&req.system))
            .await?;
        Ok(text)
    }
}
