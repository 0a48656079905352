//! Review pipeline: document text in, findings out.
//!
//! Flow:
//!   1) Estimate the token budget; small documents go out in a single request;
//!   2) Otherwise chunk semantically and review the chunks **sequentially**;
//!   3) Each request is retried with backoff, bounded by a timeout;
//!   4) A failed chunk is skipped; only a run where every request failed is an error;
//!   5) Parse each response into findings, apply the dedup policy.
//!
//! Logs:
//! - `INFO`: final summary (#chunks, #failed, #findings, timing)
//! - `DEBUG`: per-chunk decisions and timings
//! - `WARN`: failed attempts and skipped chunks

pub mod completion;
pub mod config;
pub mod policy;
pub mod prompt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ai_llm_service::Purpose;
use tracing::{debug, info, warn};

use crate::budget::{estimate_tokens, should_chunk, truncate_to_budget};
use crate::chunker::chunk_document;
use crate::errors::{CompletionError, Error, ReviewResult};
use crate::findings::{Finding, parse_findings, parse_findings_in_section};
use crate::telemetry::prompt_dump::PromptDumper;

use completion::{CompletionRequest, CompletionService};
use config::ReviewConfig;
use policy::dedup_in_place;
use prompt::{
    REVIEW_SYSTEM, SUMMARY_SYSTEM, build_chunk_prompt, build_review_prompt, build_summary_prompt,
};

/// Returned by [`summarize_document`] when the model answers with blank text.
pub const EMPTY_SUMMARY_NOTICE: &str = "Unable to generate summary";

/// Handle shared between a running review and whoever may abandon it.
///
/// Abandoning only stops further chunk requests; an in-flight request is
/// awaited and its findings kept.
#[derive(Debug, Clone, Default)]
pub struct ReviewSession {
    abandoned: Arc<AtomicBool>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

/// Reviews `text` and returns the findings in document order.
///
/// # Errors
/// [`Error::ReviewUnavailable`] when every completion request failed.
pub async fn generate_findings<C: CompletionService>(
    service: &C,
    text: &str,
    cfg: &ReviewConfig,
) -> ReviewResult<Vec<Finding>> {
    generate_findings_in_session(service, text, cfg, &ReviewSession::new()).await
}

/// Same as [`generate_findings`], stopping early once `session` is abandoned.
pub async fn generate_findings_in_session<C: CompletionService>(
    service: &C,
    text: &str,
    cfg: &ReviewConfig,
    session: &ReviewSession,
) -> ReviewResult<Vec<Finding>> {
    let t0 = Instant::now();
    if text.trim().is_empty() {
        debug!("review: blank document, nothing to review");
        return Ok(Vec::new());
    }
    if session.is_abandoned() {
        debug!("review: session abandoned before start");
        return Ok(Vec::new());
    }

    let dumper = PromptDumper::from_env();
    let tokens = estimate_tokens(text);

    let mut findings = if !should_chunk(text, cfg.chunk_threshold_tokens) {
        debug!(
            "review: single pass (tokens≈{} threshold={})",
            tokens, cfg.chunk_threshold_tokens
        );
        single_pass(service, text, cfg, &dumper).await?
    } else {
        debug!(
            "review: chunked (tokens≈{} threshold={})",
            tokens, cfg.chunk_threshold_tokens
        );
        chunked(service, text, cfg, session, &dumper).await?
    };

    let before = findings.len();
    dedup_in_place(&mut findings, cfg.dedup);
    if findings.len() != before {
        debug!(
            "review: dedup {:?} removed {} finding(s)",
            cfg.dedup,
            before - findings.len()
        );
    }

    info!(
        "review: done findings={} tokens≈{} total={}ms",
        findings.len(),
        tokens,
        t0.elapsed().as_millis()
    );
    Ok(findings)
}

async fn single_pass<C: CompletionService>(
    service: &C,
    text: &str,
    cfg: &ReviewConfig,
    dumper: &PromptDumper,
) -> ReviewResult<Vec<Finding>> {
    let req = CompletionRequest {
        purpose: Purpose::Review,
        system: REVIEW_SYSTEM.to_string(),
        prompt: build_review_prompt(text),
    };

    match complete_with_retry(service, &req, cfg, "single").await {
        Ok(out) => {
            dumper.dump("single", 0, &req.prompt, Some(&out));
            Ok(parse_findings(&out, text))
        }
        Err(e) => {
            dumper.dump("single", 0, &req.prompt, None);
            warn!(error = %e, "review: single-pass request failed");
            Err(Error::ReviewUnavailable {
                chunks: 1,
                last_error: Some(e.to_string()),
            })
        }
    }
}

async fn chunked<C: CompletionService>(
    service: &C,
    text: &str,
    cfg: &ReviewConfig,
    session: &ReviewSession,
    dumper: &PromptDumper,
) -> ReviewResult<Vec<Finding>> {
    let chunks = chunk_document(text, &cfg.chunk);
    let total = chunks.len();
    debug!("review: {} chunk(s)", total);

    let mut findings: Vec<Finding> = Vec::new();
    let mut ok = 0usize;
    let mut failed = 0usize;
    let mut last_error: Option<String> = None;

    for (idx, chunk) in chunks.iter().enumerate() {
        if session.is_abandoned() {
            info!(
                "review: session abandoned after {}/{} chunk(s)",
                ok + failed,
                total
            );
            return Ok(findings);
        }

        let part = idx + 1;
        let t_one = Instant::now();
        let req = CompletionRequest {
            purpose: Purpose::Review,
            system: REVIEW_SYSTEM.to_string(),
            prompt: build_chunk_prompt(&chunk.text, part, total),
        };

        match complete_with_retry(service, &req, cfg, "chunk").await {
            Ok(out) => {
                dumper.dump("chunk", part, &req.prompt, Some(&out));
                let found = parse_findings_in_section(&out, text, part);
                debug!(
                    "review: chunk {}/{} findings={} offsets={:?} took={}ms",
                    part,
                    total,
                    found.len(),
                    chunk.offsets,
                    t_one.elapsed().as_millis()
                );
                findings.extend(found);
                ok += 1;
            }
            Err(e) => {
                dumper.dump("chunk", part, &req.prompt, None);
                warn!(chunk = part, total, error = %e, "review: chunk skipped");
                last_error = Some(e.to_string());
                failed += 1;
            }
        }
    }

    if ok == 0 && failed > 0 {
        return Err(Error::ReviewUnavailable {
            chunks: failed,
            last_error,
        });
    }
    if failed > 0 {
        info!("review: {} of {} chunk(s) failed; partial result", failed, total);
    }
    Ok(findings)
}

/// Calls the service up to `cfg.max_attempts` times.
///
/// Blank responses count as failures. Backoff grows linearly with the attempt number.
/// A failure that [`CompletionError::is_retryable`] rejects ends the loop at once.
async fn complete_with_retry<C: CompletionService>(
    service: &C,
    req: &CompletionRequest,
    cfg: &ReviewConfig,
    stage: &str,
) -> Result<String, CompletionError> {
    let mut last: Option<CompletionError> = None;

    for attempt in 1..=cfg.max_attempts {
        let t = Instant::now();
        let outcome = match tokio::time::timeout(cfg.request_timeout, service.complete(req)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(CompletionError::EmptyResponse),
            Ok(res) => res,
            Err(_) => Err(CompletionError::Timeout(cfg.request_timeout)),
        };

        match outcome {
            Ok(text) => {
                debug!(
                    stage,
                    attempt,
                    latency_ms = t.elapsed().as_millis() as u64,
                    chars = text.chars().count(),
                    "completion ok"
                );
                return Ok(text);
            }
            Err(e) if !e.is_retryable() => {
                warn!(stage, attempt, error = %e, "completion failed permanently, not retrying");
                return Err(e);
            }
            Err(e) => {
                warn!(stage, attempt, max = cfg.max_attempts, error = %e, "completion attempt failed");
                last = Some(e);
                if attempt < cfg.max_attempts {
                    tokio::time::sleep(cfg.retry_backoff * attempt).await;
                }
            }
        }
    }

    Err(last.unwrap_or_else(|| CompletionError::Unavailable("no attempt was made".to_string())))
}

/// Summarizes `text`, truncated to `cfg.summary_max_tokens`.
///
/// # Errors
/// [`Error::Completion`] when the summary request failed after retries.
pub async fn summarize_document<C: CompletionService>(
    service: &C,
    text: &str,
    name: &str,
    cfg: &ReviewConfig,
) -> ReviewResult<String> {
    let t0 = Instant::now();
    let truncated = truncate_to_budget(text, cfg.summary_max_tokens);
    if truncated.was_truncated {
        debug!(
            "summary: truncated to {} chars (budget {} tokens)",
            truncated.text.chars().count(),
            cfg.summary_max_tokens
        );
    }

    let req = CompletionRequest {
        purpose: Purpose::Summary,
        system: SUMMARY_SYSTEM.to_string(),
        prompt: build_summary_prompt(name, &truncated.text, truncated.was_truncated),
    };

    let dumper = PromptDumper::from_env();
    let summary = match complete_with_retry(service, &req, cfg, "summary").await {
        Ok(out) => {
            dumper.dump("summary", 0, &req.prompt, Some(&out));
            out.trim().to_string()
        }
        Err(CompletionError::EmptyResponse) => {
            dumper.dump("summary", 0, &req.prompt, None);
            EMPTY_SUMMARY_NOTICE.to_string()
        }
        Err(e) => {
            dumper.dump("summary", 0, &req.prompt, None);
            return Err(Error::Completion(e));
        }
    };

    info!(
        "summary: done chars={} truncated={} total={}ms",
        summary.chars().count(),
        truncated.was_truncated,
        t0.elapsed().as_millis()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<CompletionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CompletionService for Scripted {
        async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push(req.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::Unavailable("script exhausted".into())))
        }
    }

    fn fast_cfg() -> ReviewConfig {
        ReviewConfig {
            retry_backoff: Duration::ZERO,
            ..ReviewConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_after_empty_response() {
        let svc = Scripted::new(vec![Ok("   ".into()), Ok("Clarity: vague".into())]);
        let out = complete_with_retry(
            &svc,
            &CompletionRequest {
                purpose: Purpose::Review,
                system: String::new(),
                prompt: "p".into(),
            },
            &fast_cfg(),
            "test",
        )
        .await
        .unwrap();
        assert_eq!(out, "Clarity: vague");
        assert_eq!(svc.calls().len(), 2);
    }

    #[tokio::test]
    async fn permanent_provider_error_is_not_retried() {
        use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};

        let rejected = ProviderError::new(Provider::OpenAI, ProviderErrorKind::MissingApiKey);
        let svc = Scripted::new(vec![
            Err(CompletionError::Provider(rejected.into())),
            Ok("Clarity: never reached".into()),
        ]);
        let cfg = ReviewConfig {
            max_attempts: 3,
            ..fast_cfg()
        };
        let req = CompletionRequest {
            purpose: Purpose::Review,
            system: String::new(),
            prompt: "p".into(),
        };
        let err = complete_with_retry(&svc, &req, &cfg, "test").await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(svc.calls().len(), 1);
    }

    #[tokio::test]
    async fn single_pass_failure_is_unavailable() {
        let svc = Scripted::new(vec![
            Err(CompletionError::Unavailable("down".into())),
            Err(CompletionError::Unavailable("still down".into())),
        ]);
        let err = generate_findings(&svc, "Short contract.", &fast_cfg())
            .await
            .unwrap_err();
        match err {
            Error::ReviewUnavailable { chunks, last_error } => {
                assert_eq!(chunks, 1);
                assert!(last_error.unwrap().contains("still down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn blank_document_makes_no_request() {
        let svc = Scripted::new(vec![]);
        let out = generate_findings(&svc, " \n ", &fast_cfg()).await.unwrap();
        assert!(out.is_empty());
        assert!(svc.calls().is_empty());
    }

    #[tokio::test]
    async fn summary_uses_summary_purpose_and_notice_on_blank() {
        let svc = Scripted::new(vec![Ok("  A short NDA.  ".into())]);
        let s = summarize_document(&svc, "Body", "NDA", &fast_cfg()).await.unwrap();
        assert_eq!(s, "A short NDA.");
        let calls = svc.calls();
        assert_eq!(calls[0].purpose, Purpose::Summary);
        assert_eq!(calls[0].system, SUMMARY_SYSTEM);

        let svc = Scripted::new(vec![Ok(String::new()), Ok("\n".into())]);
        let s = summarize_document(&svc, "Body", "NDA", &fast_cfg()).await.unwrap();
        assert_eq!(s, EMPTY_SUMMARY_NOTICE);
    }

    #[tokio::test]
    async fn summary_failure_is_completion_error() {
        let svc = Scripted::new(vec![]);
        let err = summarize_document(&svc, "Body", "NDA", &fast_cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Completion(CompletionError::Unavailable(_))));
    }

    #[test]
    fn session_abandon_is_shared_between_clones() {
        let s = ReviewSession::new();
        let other = s.clone();
        assert!(!s.is_abandoned());
        other.abandon();
        assert!(s.is_abandoned());
    }
}
