//! Structured document model consumed by the range mapper.
//!
//! The editor owns the real tree; this crate only needs to read it. Any editor
//! adapter implements [`LiveDocument`]. [`DocumentTree`] is the owned model
//! used by the CLI and tests, buildable from editor body HTML.

use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

/// Node of a structured document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    Element(Element),
    Text(String),
}

impl DocNode {
    pub fn text(s: impl Into<String>) -> Self {
        DocNode::Text(s.into())
    }

    /// Child at `index`, for elements.
    pub fn child(&self, index: usize) -> Option<&DocNode> {
        match self {
            DocNode::Element(el) => el.children.get(index),
            DocNode::Text(_) => None,
        }
    }

    /// Node at the child-index path `path`, starting here.
    pub fn at(&self, path: &[usize]) -> Option<&DocNode> {
        path.iter().try_fold(self, |node, &i| node.child(i))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub children: Vec<DocNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_child(mut self, child: DocNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl From<Element> for DocNode {
    fn from(el: Element) -> Self {
        DocNode::Element(el)
    }
}

/// Reference to a text leaf: child indices from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeafRef(pub Vec<usize>);

/// Read access to the editor's current document.
pub trait LiveDocument {
    /// The editor's plain-text rendering of the document.
    fn flattened_text(&self) -> String;

    /// Root of the structured content.
    fn root(&self) -> &DocNode;
}

/// Subtrees that carry no document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRules {
    pub tags: Vec<String>,
    pub classes: Vec<String>,
}

impl Default for SkipRules {
    fn default() -> Self {
        Self {
            tags: vec!["script".into(), "style".into()],
            classes: vec!["mce-comment".into(), "mce-comment-body".into()],
        }
    }
}

impl SkipRules {
    pub fn skips(&self, el: &Element) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(&el.tag))
            || self.classes.iter().any(|c| el.has_class(c))
    }
}

/// Owned document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    root: DocNode,
    /// Text the editor reports; derived from the leaves when absent.
    flattened: Option<String>,
}

impl DocumentTree {
    pub fn new(root: impl Into<DocNode>) -> Self {
        Self {
            root: root.into(),
            flattened: None,
        }
    }

    /// Overrides the flattened text, as an editor that renders it differently would.
    pub fn with_flattened_text(mut self, text: impl Into<String>) -> Self {
        self.flattened = Some(text.into());
        self
    }

    /// Parses editor body HTML. Comments and doctype nodes are dropped.
    pub fn from_html(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        Self::new(convert(fragment.root_element()))
    }

    /// Text sent for review: content leaves with a blank line between
    /// block-level elements, so paragraph-aware chunking sees the paragraphs.
    /// Leaf offsets used for locating are those of [`LiveDocument::flattened_text`].
    pub fn review_text(&self) -> String {
        let mut text = BlockText::default();
        text.collect(&self.root, &SkipRules::default());
        text.out
    }

    /// Text of the leaf at `leaf`, if it is one.
    pub fn leaf_text(&self, leaf: &LeafRef) -> Option<&str> {
        match self.root.at(&leaf.0)? {
            DocNode::Text(t) => Some(t.as_str()),
            DocNode::Element(_) => None,
        }
    }
}

impl LiveDocument for DocumentTree {
    fn flattened_text(&self) -> String {
        match &self.flattened {
            Some(text) => text.clone(),
            None => flatten(&self.root, &SkipRules::default()),
        }
    }

    fn root(&self) -> &DocNode {
        &self.root
    }
}

/// Concatenated text of all content leaves, in document order.
pub fn flatten(root: &DocNode, rules: &SkipRules) -> String {
    let mut out = String::new();
    collect_text(root, rules, &mut out);
    out
}

fn collect_text(node: &DocNode, rules: &SkipRules, out: &mut String) {
    match node {
        DocNode::Text(t) => out.push_str(t),
        DocNode::Element(el) if rules.skips(el) => {}
        DocNode::Element(el) => el.children.iter().for_each(|c| collect_text(c, rules, out)),
    }
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "blockquote", "pre",
    "table", "tr", "section", "article", "header", "footer",
];

fn is_block(el: &Element) -> bool {
    BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(&el.tag))
}

#[derive(Default)]
struct BlockText {
    out: String,
    pending_break: bool,
}

impl BlockText {
    fn collect(&mut self, node: &DocNode, rules: &SkipRules) {
        match node {
            DocNode::Text(t) => {
                if t.is_empty() {
                    return;
                }
                if self.pending_break && !self.out.is_empty() {
                    let trimmed = self.out.trim_end().len();
                    self.out.truncate(trimmed);
                    self.out.push_str("\n\n");
                    self.out.push_str(t.trim_start());
                } else {
                    self.out.push_str(t);
                }
                self.pending_break = false;
            }
            DocNode::Element(el) if rules.skips(el) => {}
            DocNode::Element(el) => {
                let block = is_block(el);
                self.pending_break |= block;
                el.children.iter().for_each(|c| self.collect(c, rules));
                self.pending_break |= block;
            }
        }
    }
}

fn convert(el: ElementRef<'_>) -> DocNode {
    let value = el.value();
    let mut out = Element::new(value.name());
    out.classes = value.classes().map(str::to_string).collect();

    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.children.push(DocNode::Text(String::from(&**t))),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.children.push(convert(child_el));
                }
            }
            _ => {}
        }
    }
    DocNode::Element(out)
}
