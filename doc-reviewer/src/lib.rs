//! Public entry for the document review core.
//!
//! Two caller-facing operations:
//!
//! 1) **Review** ([`generate_findings`])
//!    - Estimate the token budget of the document text
//!    - Send it in one request, or chunk it semantically and review part by part
//!    - Parse the free-form model output into typed [`Finding`]s
//!
//! 2) **Locate** ([`locate_finding`])
//!    - Resolve a finding's quoted excerpt to a span of the flattened text
//!      (exact, then phrase recovery, then a single long word)
//!    - Map that span onto content leaves of the live structured document
//!
//! The review path talks to a language model through [`CompletionService`];
//! the locate path is synchronous and never fails with an error, only with an
//! [`Unanchorable`] reason. All offsets are Unicode-scalar (char) offsets.
//!
//! The crate uses `tracing` for logging and avoids `async-trait` and heap
//! trait objects; the completion seam is a plain trait with static dispatch.

pub mod budget;
pub mod chunker;
pub mod errors;
pub mod findings;
pub mod locate;
pub mod review;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use errors::{CompletionError, Error, ReviewResult};
pub use findings::{Category, Finding, FindingId, Severity};
pub use locate::{
    Confidence, DocumentTree, LiveDocument, LocateOutcome, ResolvedSpan, StructuredAnchor,
    Unanchorable, locate_finding,
};
pub use review::completion::{CompletionRequest, CompletionService};
pub use review::config::ReviewConfig;
pub use review::{ReviewSession, generate_findings, generate_findings_in_session, summarize_document};
