//! Flattened-text ranges to structured-document positions.
//!
//! A depth-first walk assigns every content leaf a `[start, end)` char
//! interval of the flattened text. The table is rebuilt for every request and
//! never kept across edits.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::resolve::ResolvedSpan;
use super::tree::{DocNode, LeafRef, LiveDocument, SkipRules};

/// One endpoint of a selection: a text leaf and a char offset inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub leaf: LeafRef,
    pub offset: usize,
}

/// Editor-facing range; valid until the next structural change of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnchor {
    pub start: AnchorPoint,
    pub end: AnchorPoint,
}

/// A content leaf and its char interval in the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry<'d> {
    pub leaf: LeafRef,
    pub text: &'d str,
    pub start: usize,
    pub end: usize,
}

impl LeafEntry<'_> {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Content leaves of a document in order, with running char intervals.
#[derive(Debug, Clone, Default)]
pub struct LeafTable<'d> {
    entries: Vec<LeafEntry<'d>>,
}

impl<'d> LeafTable<'d> {
    /// Walks `root` depth-first, skipping subtrees matched by `rules`.
    pub fn build(root: &'d DocNode, rules: &SkipRules) -> Self {
        let mut table = Self::default();
        let mut path = Vec::new();
        let mut cursor = 0usize;
        table.visit(root, rules, &mut path, &mut cursor);
        table
    }

    fn visit(&mut self, node: &'d DocNode, rules: &SkipRules, path: &mut Vec<usize>, cursor: &mut usize) {
        match node {
            DocNode::Text(text) => {
                let len = text.chars().count();
                self.entries.push(LeafEntry {
                    leaf: LeafRef(path.clone()),
                    text,
                    start: *cursor,
                    end: *cursor + len,
                });
                *cursor += len;
            }
            DocNode::Element(el) if rules.skips(el) => {}
            DocNode::Element(el) => {
                for (i, child) in el.children.iter().enumerate() {
                    path.push(i);
                    self.visit(child, rules, path, cursor);
                    path.pop();
                }
            }
        }
    }

    pub fn entries(&self) -> &[LeafEntry<'d>] {
        &self.entries
    }

    /// Concatenated text of all visited leaves.
    pub fn text(&self) -> String {
        self.entries.iter().map(|e| e.text).collect()
    }

    /// Compares the leaf text with `flattened`; a mismatch is logged, not fatal.
    pub fn check_consistency(&self, flattened: &str) -> bool {
        let rebuilt = self.text();
        if rebuilt == flattened {
            return true;
        }
        let first_divergence = rebuilt
            .chars()
            .zip(flattened.chars())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| rebuilt.chars().count().min(flattened.chars().count()));
        warn!(
            leaf_chars = rebuilt.chars().count(),
            flattened_chars = flattened.chars().count(),
            first_divergence,
            "leaf text does not match flattened text; anchors may drift"
        );
        false
    }

    /// Anchors the char range `start..end`.
    ///
    /// `start` belongs to the leaf with `start <= s < end`; `end` to the leaf
    /// with `start < e <= end`, so a boundary on a leaf's end stays in that
    /// leaf. When either lookup fails, both endpoints fall back to the leaf
    /// holding `start`, clamped to its length.
    pub fn anchor(&self, start: usize, end: usize) -> Option<StructuredAnchor> {
        let start_hit = self.entries.iter().find(|e| start >= e.start && start < e.end);
        let end_hit = self.entries.iter().find(|e| end > e.start && end <= e.end);

        if let (Some(s), Some(e)) = (start_hit, end_hit) {
            return Some(StructuredAnchor {
                start: AnchorPoint {
                    leaf: s.leaf.clone(),
                    offset: start - s.start,
                },
                end: AnchorPoint {
                    leaf: e.leaf.clone(),
                    offset: end - e.start,
                },
            });
        }

        warn!(start, end, leaves = self.entries.len(), "no exact leaves for range; trying single-leaf recovery");
        let leaf = start_hit?;
        debug!(leaf = ?leaf.leaf, "anchoring both endpoints in the start leaf");
        Some(StructuredAnchor {
            start: AnchorPoint {
                leaf: leaf.leaf.clone(),
                offset: (start - leaf.start).min(leaf.len()),
            },
            end: AnchorPoint {
                leaf: leaf.leaf.clone(),
                offset: end.saturating_sub(leaf.start).min(leaf.len()),
            },
        })
    }

    /// Text covered by `anchor`, for checking a selection before acting on it.
    pub fn text_between(&self, anchor: &StructuredAnchor) -> Option<String> {
        let si = self.entries.iter().position(|e| e.leaf == anchor.start.leaf)?;
        let ei = self.entries.iter().position(|e| e.leaf == anchor.end.leaf)?;
        if ei < si {
            return None;
        }

        let mut out = String::new();
        for (i, e) in self.entries[si..=ei].iter().enumerate() {
            let from = if i == 0 { anchor.start.offset } else { 0 };
            let to = if si + i == ei { anchor.end.offset } else { e.len() };
            if to < from {
                return None;
            }
            out.extend(e.text.chars().skip(from).take(to - from));
        }
        Some(out)
    }
}

/// Maps `span` onto the live document, using a fresh flattened text and leaf table.
pub fn map_to_document_range(span: &ResolvedSpan, doc: &impl LiveDocument) -> Option<StructuredAnchor> {
    let flattened = doc.flattened_text();
    map_with_flattened(span, doc, &flattened)
}

pub(crate) fn map_with_flattened(
    span: &ResolvedSpan,
    doc: &impl LiveDocument,
    flattened: &str,
) -> Option<StructuredAnchor> {
    let table = LeafTable::build(doc.root(), &SkipRules::default());
    table.check_consistency(flattened);
    table.anchor(span.start, span.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::resolve::Confidence;
    use crate::locate::tree::{DocumentTree, Element};
    use pretty_assertions::assert_eq;

    fn span(start: usize, end: usize) -> ResolvedSpan {
        ResolvedSpan {
            start,
            end,
            matched_text: String::new(),
            confidence: Confidence::Exact,
        }
    }

    fn hello_world() -> DocumentTree {
        DocumentTree::new(
            Element::new("body")
                .with_child(DocNode::text("Hello "))
                .with_child(DocNode::text("world")),
        )
    }

    #[test]
    fn range_in_second_leaf() {
        let doc = hello_world();
        let a = map_to_document_range(&span(6, 11), &doc).unwrap();
        assert_eq!(a.start, AnchorPoint { leaf: LeafRef(vec![1]), offset: 0 });
        assert_eq!(a.end, AnchorPoint { leaf: LeafRef(vec![1]), offset: 5 });
    }

    #[test]
    fn end_on_boundary_stays_in_left_leaf() {
        let doc = hello_world();
        let a = map_to_document_range(&span(0, 6), &doc).unwrap();
        assert_eq!(a.end, AnchorPoint { leaf: LeafRef(vec![0]), offset: 6 });
    }

    #[test]
    fn range_across_leaves() {
        let doc = hello_world();
        let root = doc.root();
        let table = LeafTable::build(root, &SkipRules::default());
        let a = table.anchor(3, 8).unwrap();
        assert_eq!(a.start.leaf, LeafRef(vec![0]));
        assert_eq!(a.end, AnchorPoint { leaf: LeafRef(vec![1]), offset: 2 });
        assert_eq!(table.text_between(&a).as_deref(), Some("lo wo"));
    }

    #[test]
    fn comment_markers_do_not_shift_offsets() {
        let doc = DocumentTree::from_html(
            r#"<p>Intro <span class="mce-comment">[c]</span>clause text</p>"#,
        );
        let flattened = doc.flattened_text();
        assert_eq!(flattened, "Intro clause text");
        let a = map_to_document_range(&span(6, 12), &doc).unwrap();
        // html → p[0] → text "clause text" is child 2
        assert_eq!(a.start, AnchorPoint { leaf: LeafRef(vec![0, 2]), offset: 0 });
        assert_eq!(a.end, AnchorPoint { leaf: LeafRef(vec![0, 2]), offset: 6 });
    }

    #[test]
    fn drifted_end_recovers_in_start_leaf() {
        let doc = hello_world();
        let a = map_to_document_range(&span(8, 40), &doc).unwrap();
        assert_eq!(a.start, AnchorPoint { leaf: LeafRef(vec![1]), offset: 2 });
        assert_eq!(a.end, AnchorPoint { leaf: LeafRef(vec![1]), offset: 5 });
    }

    #[test]
    fn start_beyond_document_is_unmappable() {
        let doc = hello_world();
        assert_eq!(map_to_document_range(&span(20, 25), &doc), None);
    }

    #[test]
    fn consistency_check_reports_drift() {
        let doc = hello_world();
        let table = LeafTable::build(doc.root(), &SkipRules::default());
        assert!(table.check_consistency("Hello world"));
        assert!(!table.check_consistency("Hello\nworld"));
    }
}
