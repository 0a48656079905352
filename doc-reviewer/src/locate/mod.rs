//! Finding location: quoted excerpt → flattened-text span → structured anchor.
//!
//! Runs on the interactive path. Everything is recomputed from the document
//! state at call time; failures are outcomes, not errors.

pub mod mapper;
pub mod resolve;
pub mod tree;

use std::ops::Range;

use serde::Serialize;
use tracing::{debug, warn};

use crate::findings::Finding;

pub use mapper::{AnchorPoint, LeafTable, StructuredAnchor, map_to_document_range};
pub use resolve::{Confidence, ResolvedSpan, resolve};
pub use tree::{DocNode, DocumentTree, Element, LeafRef, LiveDocument, SkipRules};

/// Why a finding has no anchor. The finding itself stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unanchorable {
    /// The finding carries no quoted excerpt.
    NoExcerpt,
    /// The excerpt could not be found in the current text.
    Unresolved,
    /// The span lies outside the current text.
    OutOfBounds,
    /// The span could not be mapped to document leaves.
    Unmapped,
}

/// Result of [`locate_finding`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocateOutcome {
    Anchored {
        span: ResolvedSpan,
        anchor: StructuredAnchor,
    },
    Unanchorable {
        reason: Unanchorable,
    },
}

impl LocateOutcome {
    pub fn anchor(&self) -> Option<&StructuredAnchor> {
        match self {
            LocateOutcome::Anchored { anchor, .. } => Some(anchor),
            LocateOutcome::Unanchorable { .. } => None,
        }
    }

    pub fn span(&self) -> Option<&ResolvedSpan> {
        match self {
            LocateOutcome::Anchored { span, .. } => Some(span),
            LocateOutcome::Unanchorable { .. } => None,
        }
    }

    fn unanchorable(reason: Unanchorable) -> Self {
        LocateOutcome::Unanchorable { reason }
    }
}

/// Resolves the finding's excerpt against the document as it is now and maps
/// the span onto its leaves.
pub fn locate_finding(finding: &Finding, doc: &impl LiveDocument) -> LocateOutcome {
    let Some(excerpt) = finding.quoted_excerpt.as_deref() else {
        return LocateOutcome::unanchorable(Unanchorable::NoExcerpt);
    };

    let flattened = doc.flattened_text();
    let Some(span) = resolve(excerpt, &flattened) else {
        debug!(finding = %finding.id, "excerpt not found in current text");
        return LocateOutcome::unanchorable(Unanchorable::Unresolved);
    };

    let len = flattened.chars().count();
    if span.start >= len || span.end > len {
        warn!(finding = %finding.id, start = span.start, end = span.end, len, "span out of bounds");
        return LocateOutcome::unanchorable(Unanchorable::OutOfBounds);
    }

    match mapper::map_with_flattened(&span, doc, &flattened) {
        Some(anchor) => {
            debug!(finding = %finding.id, confidence = ?span.confidence, "finding anchored");
            LocateOutcome::Anchored { span, anchor }
        }
        None => LocateOutcome::unanchorable(Unanchorable::Unmapped),
    }
}

/// `text[range]` with `range` in chars.
pub(crate) fn char_slice(text: &str, range: Range<usize>) -> Option<&str> {
    if range.start > range.end {
        return None;
    }
    let mut bounds = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()));
    let start = bounds.nth(range.start)?;
    let end = if range.end == range.start {
        start
    } else {
        bounds.nth(range.end - range.start - 1)?
    };
    text.get(start..end)
}
