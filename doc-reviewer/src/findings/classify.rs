//! Category classification of review-text segments.
//!
//! An explicit, priority-ordered rule table: the first rule with a matching
//! keyword wins. A segment that opens with a category label (`Clarity: ...`)
//! is classified by the label alone.

use super::{Category, Severity};

/// One row of the classifier: keywords, resulting category, default severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub default_severity: Severity,
}

/// Rules in priority order.
pub const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::DataProtection,
        keywords: &["data protection", "personal data", "consent"],
        default_severity: Severity::High,
    },
    CategoryRule {
        category: Category::LegalRisk,
        keywords: &["legal risk", "litigation", "penalty"],
        default_severity: Severity::High,
    },
    CategoryRule {
        category: Category::Regulatory,
        keywords: &["regulatory", "licensing", "reporting"],
        default_severity: Severity::Medium,
    },
    CategoryRule {
        category: Category::Compliance,
        keywords: &["compliance", "gdpr", "regulation"],
        default_severity: Severity::Medium,
    },
    CategoryRule {
        category: Category::Clarity,
        keywords: &["clarity", "ambiguous", "unclear"],
        default_severity: Severity::Low,
    },
    CategoryRule {
        category: Category::Structure,
        keywords: &["structure", "formatting", "missing"],
        default_severity: Severity::Low,
    },
];

/// Rule for `category`.
pub fn rule_for(category: Category) -> &'static CategoryRule {
    RULES
        .iter()
        .find(|r| r.category == category)
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Classifies a segment: explicit leading label first, then keywords found
/// outside quoted passages.
pub fn classify(segment: &str) -> Option<&'static CategoryRule> {
    split_label(segment)
        .and_then(|(label, _)| rule_for_label(label))
        .or_else(|| classify_keywords(&unquoted(segment)))
}

/// Keyword scan, case-insensitive, underscores read as spaces.
pub fn classify_keywords(text: &str) -> Option<&'static CategoryRule> {
    let norm = normalize(text);
    RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| norm.contains(k)))
}

/// Rule whose category label equals `label` (`"Data Protection"`, `"legal_risk"`).
pub fn rule_for_label(label: &str) -> Option<&'static CategoryRule> {
    let norm = normalize(label);
    let norm = norm.trim();
    RULES.iter().find(|r| normalize(r.category.as_str()) == norm)
}

/// If `s` starts with a category label followed by `:`, returns the rule and
/// the byte length of `label:`.
pub fn label_at(s: &str) -> Option<(&'static CategoryRule, usize)> {
    RULES.iter().find_map(|r| {
        let label = r.category.as_str();
        let n = label.len();
        let head = s.get(..n)?;
        let same = head
            .chars()
            .map(|c| if c == '_' { ' ' } else { c.to_ascii_lowercase() })
            .eq(label.chars().map(|c| if c == '_' { ' ' } else { c }));
        (same && s[n..].starts_with(':')).then_some((r, n + 1))
    })
}

/// Splits `Label: value` when the label is short and holds no quote.
pub fn split_label(s: &str) -> Option<(&str, &str)> {
    let (label, value) = s.split_once(':')?;
    let label = label.trim();
    let plausible = !label.is_empty()
        && label.chars().count() <= 48
        && !label.contains(['"', '“', '”']);
    plausible.then(|| (label, value.trim()))
}

/// Structured field lines that attach to the finding being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Type,
    Severity,
    Regulation,
    Recommendation,
    Excerpt,
    Message,
}

pub fn field_kind(label: &str) -> Option<FieldKind> {
    let norm = normalize(label);
    let kind = match norm.trim() {
        "type" | "category" | "issue type" => FieldKind::Type,
        "severity" | "risk level" => FieldKind::Severity,
        "eu regulation" | "regulation" | "regulation reference" | "applicable regulation"
        | "eu regulation reference" | "legal basis" => FieldKind::Regulation,
        "recommendation" | "brief recommendation" | "suggestion" | "suggested fix" => {
            FieldKind::Recommendation
        }
        "quote" | "quoted text" | "excerpt" | "quoted excerpt" | "text" | "text segment"
        | "complete text segment" => FieldKind::Excerpt,
        "issue" | "description" | "explanation" | "problem" => FieldKind::Message,
        _ => return None,
    };
    Some(kind)
}

/// `text` with quoted passages (straight or curly) blanked out.
pub fn unquoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_straight = false;
    let mut in_curly = false;
    for c in text.chars() {
        match c {
            '"' if !in_curly => in_straight = !in_straight,
            '“' if !in_straight => in_curly = true,
            '”' if !in_straight => in_curly = false,
            _ if in_straight || in_curly => {}
            _ => out.push(c),
        }
    }
    out
}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace('_', " ")
}
