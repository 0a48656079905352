use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use doc_reviewer::chunker::{ChunkParams, chunk_document};
use doc_reviewer::locate::{Confidence, resolve};
use doc_reviewer::{
    Category, CompletionError, CompletionRequest, CompletionService, DocumentTree, Error,
    LocateOutcome, ReviewConfig, ReviewSession, generate_findings, generate_findings_in_session,
    locate_finding,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const CONTRACT: &str =
    "The vendor shall process personal data in accordance with applicable law. This clause is ambiguous.";

const MODEL_OUTPUT: &str = r#"Data Protection: Missing specifics. "process personal data in accordance with applicable law" Clarity: Ambiguous term. "This clause is ambiguous.""#;

/// Replays canned replies in order; optionally abandons a session on the first call.
struct Scripted {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
    abandon_on_call: Option<ReviewSession>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            abandon_on_call: None,
        }
    }

    fn abandoning(mut self, session: ReviewSession) -> Self {
        self.abandon_on_call = Some(session);
        self
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionService for Scripted {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(req.prompt.clone());
        if let Some(s) = &self.abandon_on_call {
            s.abandon();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CompletionError::Unavailable("script exhausted".into())))
    }
}

fn down() -> Result<String, CompletionError> {
    Err(CompletionError::Unavailable("provider down".into()))
}

fn vague_replies(n: usize) -> Vec<Result<String, CompletionError>> {
    (0..n).map(|_| Ok("Clarity: vague wording.".to_string())).collect()
}

fn single_attempt() -> ReviewConfig {
    ReviewConfig {
        max_attempts: 1,
        retry_backoff: Duration::ZERO,
        ..ReviewConfig::default()
    }
}

/// Three ~47-char paragraphs; with a 20-token (60-char) budget each becomes a chunk.
fn long_document() -> (String, ReviewConfig) {
    let text = [
        "The supplier may share customer records freely.",
        "Termination terms are described nowhere at all.",
        "Payment is due whenever the buyer feels ready.",
    ]
    .join("\n\n");
    let cfg = ReviewConfig {
        chunk_threshold_tokens: 20,
        chunk: ChunkParams {
            max_chunk_tokens: 20,
            overlap_tokens: 0,
            min_chunk_chars: 10,
        },
        ..single_attempt()
    };
    (text, cfg)
}

#[tokio::test]
async fn end_to_end_findings_resolve_exactly() {
    let svc = Scripted::new(vec![Ok(MODEL_OUTPUT.into())]);
    let findings = generate_findings(&svc, CONTRACT, &single_attempt()).await.unwrap();

    let categories: Vec<_> = findings.iter().map(|f| f.category).collect();
    assert_eq!(categories, vec![Category::DataProtection, Category::Clarity]);

    let excerpts: Vec<_> = findings.iter().map(|f| f.quoted_excerpt.as_deref()).collect();
    assert_eq!(
        excerpts,
        vec![
            Some("process personal data in accordance with applicable law"),
            Some("This clause is ambiguous."),
        ]
    );

    for f in &findings {
        let span = resolve(f.quoted_excerpt.as_deref().unwrap(), CONTRACT).unwrap();
        assert_eq!(span.confidence, Confidence::Exact);
    }

    // Below the threshold: exactly one single-pass request.
    let prompts = svc.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Analyze this legal document"));
}

#[tokio::test]
async fn truncated_quote_is_shortened_before_resolution() {
    let svc = Scripted::new(vec![Ok(
        r#"Data Protection: Vague basis. "personal data in accordance...""#.into(),
    )]);
    let findings = generate_findings(&svc, CONTRACT, &single_attempt()).await.unwrap();

    assert_eq!(findings.len(), 1);
    let excerpt = findings[0].quoted_excerpt.as_deref().unwrap();
    assert_eq!(excerpt, "personal data in accordance");
    assert_eq!(resolve(excerpt, CONTRACT).unwrap().confidence, Confidence::Exact);
}

#[tokio::test]
async fn unrecognized_output_yields_one_clarity_finding() {
    let svc = Scripted::new(vec![Ok("Looks fine to me overall.".into())]);
    let findings = generate_findings(&svc, CONTRACT, &single_attempt()).await.unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category, Category::Clarity);
}

#[tokio::test]
async fn long_documents_are_reviewed_per_chunk() {
    let (text, cfg) = long_document();
    let n = chunk_document(&text, &cfg.chunk).len();
    assert_eq!(n, 3);

    let svc = Scripted::new(vague_replies(n));
    let findings = generate_findings(&svc, &text, &cfg).await.unwrap();

    assert_eq!(findings.len(), n);
    assert!(findings[0].message.starts_with("[Section 1]"));
    assert!(findings[2].message.starts_with("[Section 3]"));
    let prompts = svc.prompts();
    assert!(prompts[1].starts_with("Review part 2/3"));
}

#[tokio::test]
async fn failed_chunk_is_skipped() {
    let (text, cfg) = long_document();
    let svc = Scripted::new(vec![
        down(),
        Ok("Clarity: vague wording.".into()),
        Ok("Structure: missing signature block.".into()),
    ]);
    let findings = generate_findings(&svc, &text, &cfg).await.unwrap();

    assert_eq!(findings.len(), 2);
    assert!(findings[0].message.starts_with("[Section 2]"));
    assert_eq!(findings[1].category, Category::Structure);
}

#[tokio::test]
async fn all_chunks_failing_is_review_unavailable() {
    let (text, cfg) = long_document();
    let svc = Scripted::new(vec![down(), down(), down()]);
    let err = generate_findings(&svc, &text, &cfg).await.unwrap_err();

    match err {
        Error::ReviewUnavailable { chunks, last_error } => {
            assert_eq!(chunks, 3);
            assert!(last_error.unwrap().contains("provider down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn abandoned_session_stops_further_requests() {
    let (text, cfg) = long_document();
    let session = ReviewSession::new();
    let svc = Scripted::new(vague_replies(3)).abandoning(session.clone());

    let findings = generate_findings_in_session(&svc, &text, &cfg, &session)
        .await
        .unwrap();

    assert_eq!(svc.prompts().len(), 1);
    assert_eq!(findings.len(), 1);
}

#[tokio::test]
async fn slow_service_times_out_and_retries() {
    struct Slow;
    impl CompletionService for Slow {
        async fn complete(&self, _req: &CompletionRequest) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("Clarity: late".into())
        }
    }

    let cfg = ReviewConfig {
        max_attempts: 2,
        request_timeout: Duration::from_millis(10),
        retry_backoff: Duration::ZERO,
        ..ReviewConfig::default()
    };
    let err = generate_findings(&Slow, CONTRACT, &cfg).await.unwrap_err();
    match err {
        Error::ReviewUnavailable { last_error, .. } => {
            assert!(last_error.unwrap().contains("timed out"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn findings_locate_in_the_editor_document() {
    let svc = Scripted::new(vec![Ok(MODEL_OUTPUT.into())]);
    let findings = generate_findings(&svc, CONTRACT, &single_attempt()).await.unwrap();

    let doc = DocumentTree::from_html(
        "<p>The vendor shall <b>process personal data</b> in accordance with applicable law. \
         This clause is ambiguous.</p>",
    );

    match locate_finding(&findings[0], &doc) {
        LocateOutcome::Anchored { span, anchor } => {
            assert_eq!(span.confidence, Confidence::Exact);
            assert_eq!(anchor.start.leaf.0, vec![0, 1, 0]);
            assert_eq!(anchor.start.offset, 0);
            assert_eq!(anchor.end.leaf.0, vec![0, 2]);
        }
        other => panic!("not anchored: {other:?}"),
    }
    assert!(locate_finding(&findings[1], &doc).anchor().is_some());
}

proptest! {
    #[test]
    fn chunks_cover_every_non_whitespace_char(
        text in "[a-z .\n]{1,300}",
        max in 5usize..40,
        overlap_pct in 0usize..100,
        min_chars in 0usize..30,
    ) {
        let params = ChunkParams {
            max_chunk_tokens: max,
            overlap_tokens: max * overlap_pct / 100,
            min_chunk_chars: min_chars,
        };
        let chunks = chunk_document(&text, &params);

        let chars: Vec<char> = text.chars().collect();
        let mut ranges = Vec::with_capacity(chunks.len());
        for c in &chunks {
            prop_assert!(c.offsets.is_some(), "chunk {:?} has no offsets", c.text);
            let r = c.offsets.clone().unwrap();
            prop_assert!(r.end <= chars.len());
            let slice: String = chars[r.clone()].iter().collect();
            prop_assert_eq!(slice.trim(), c.text.as_str());
            ranges.push(r);
        }

        // Sorted ranges leave no non-whitespace char of the source uncovered.
        ranges.sort_by_key(|r| (r.start, r.end));
        let mut covered_to = 0usize;
        for r in &ranges {
            let gap = covered_to..r.start.max(covered_to);
            prop_assert!(
                chars[gap.clone()].iter().all(|c| c.is_whitespace()),
                "gap {:?} holds text", gap
            );
            covered_to = covered_to.max(r.end);
        }
        prop_assert!(chars[covered_to..].iter().all(|c| c.is_whitespace()), "tail after {} uncovered", covered_to);

        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        }
    }
}
