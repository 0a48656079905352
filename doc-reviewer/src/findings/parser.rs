//! Heuristic parser for free-form review text.
//!
//! Line-oriented: each line (further split at inline category labels that sit
//! outside quotes) is a segment. A segment that classifies to a category opens
//! a new finding; field lines (`Severity:`, `Recommendation:`, ...) fill the
//! open finding; anything else is appended to its message. Text before the
//! first classified segment becomes a `clarity`/`medium` finding of its own.
//! If nothing classifies, a single `clarity`/`low` fallback finding carries
//! the raw text instead.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::classify::{
    CategoryRule, FieldKind, classify, classify_keywords, field_kind, label_at, rule_for,
    split_label,
};
use super::excerpt::{clean_excerpt, extract_excerpt};
use super::{Category, Finding, FindingId, Severity};

/// Message of the fallback finding when the model returned nothing usable.
pub const EMPTY_OUTPUT_NOTICE: &str =
    "Document review completed. No specific findings could be extracted from the model response.";

/// Recommendation attached to the fallback finding.
pub const FALLBACK_RECOMMENDATION: &str =
    "Consider having a qualified legal professional review the document.";

/// Parses single-pass review output.
///
/// `document` is the reviewed text; it is only used to report how many
/// excerpts occur in it verbatim.
pub fn parse_findings(output: &str, document: &str) -> Vec<Finding> {
    parse(output, document, None)
}

/// Parses the output for one chunk; messages get a `[Section n]: ` prefix.
pub fn parse_findings_in_section(output: &str, document: &str, section: usize) -> Vec<Finding> {
    parse(output, document, Some(section))
}

fn parse(output: &str, document: &str, section: Option<usize>) -> Vec<Finding> {
    let started = Instant::now();
    let mut drafts: Vec<Draft> = Vec::new();
    let mut open: Option<Draft> = None;
    let mut classified = false;

    for seg in segments(output) {
        let s = strip_list_marker(&seg);
        if s.is_empty() {
            continue;
        }
        let labelled = split_label(s);

        if let Some((label, value)) = labelled {
            match field_kind(label) {
                Some(FieldKind::Type) => {
                    if let Some(rule) = classify_keywords(value) {
                        classified = true;
                        flush(&mut open, &mut drafts);
                        open = Some(Draft::new(rule, ""));
                        continue;
                    }
                }
                Some(kind) => {
                    if let Some(d) = open.as_mut() {
                        d.apply(kind, value);
                        continue;
                    }
                }
                None => {}
            }
        }

        if let Some(rule) = classify(s) {
            classified = true;
            flush(&mut open, &mut drafts);
            let message = labelled.map_or(s, |(_, value)| value);
            open = Some(Draft::new(rule, message));
        } else if let Some(d) = open.as_mut() {
            d.append(s);
        } else {
            debug!(segment = %s, "text before the first category; keeping it as a finding");
            open = Some(Draft::preamble(s));
        }
    }
    flush(&mut open, &mut drafts);

    let findings: Vec<Finding> = if !classified || drafts.is_empty() {
        debug!("no category matched; emitting fallback finding");
        vec![fallback(output, section)]
    } else {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| d.finish(section, i))
            .collect()
    };

    let with_excerpt = findings.iter().filter(|f| f.quoted_excerpt.is_some()).count();
    let verbatim = findings
        .iter()
        .filter_map(|f| f.quoted_excerpt.as_deref())
        .filter(|q| document.contains(q))
        .count();
    debug!(
        ?section,
        findings = findings.len(),
        with_excerpt,
        verbatim,
        elapsed_ms = started.elapsed().as_millis(),
        "review output parsed"
    );
    findings
}

/// Finding under construction.
#[derive(Debug)]
struct Draft {
    category: Category,
    severity: Severity,
    message: String,
    excerpt: Option<String>,
    regulation: Option<String>,
    recommendation: Option<String>,
}

impl Draft {
    fn new(rule: &CategoryRule, message: &str) -> Self {
        Self {
            category: rule.category,
            severity: rule.default_severity,
            message: message.trim().to_string(),
            excerpt: None,
            regulation: None,
            recommendation: None,
        }
    }

    /// Unlabelled text ahead of the first category.
    fn preamble(message: &str) -> Self {
        Self {
            severity: Severity::Medium,
            ..Self::new(rule_for(Category::Clarity), message)
        }
    }

    fn append(&mut self, text: &str) {
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        self.message.push_str(text.trim());
    }

    fn apply(&mut self, kind: FieldKind, value: &str) {
        match kind {
            FieldKind::Severity => {
                if let Some(sev) = Severity::from_text(value) {
                    self.severity = sev;
                }
            }
            FieldKind::Regulation => {
                if !is_placeholder(value) {
                    self.regulation = Some(value.to_string());
                }
            }
            FieldKind::Recommendation => {
                if !value.is_empty() {
                    self.recommendation = Some(match self.recommendation.take() {
                        Some(prev) => format!("{prev} {value}"),
                        None => value.to_string(),
                    });
                }
            }
            FieldKind::Excerpt => {
                self.excerpt = extract_excerpt(value).or_else(|| clean_excerpt(value));
            }
            FieldKind::Message | FieldKind::Type => self.append(value),
        }
    }

    fn is_empty(&self) -> bool {
        self.message.is_empty() && self.excerpt.is_none() && self.recommendation.is_none()
    }

    fn finish(self, section: Option<usize>, ordinal: usize) -> Finding {
        let quoted_excerpt = self.excerpt.or_else(|| extract_excerpt(&self.message));
        let message = if self.message.is_empty() {
            format!("{} issue", self.category.label())
        } else {
            self.message
        };
        let message = with_section(section, message);

        Finding {
            id: finding_id(section, ordinal, &message),
            category: self.category,
            severity: self.severity,
            message,
            quoted_excerpt,
            regulation_ref: self.regulation,
            recommendation: self.recommendation,
        }
    }
}

fn flush(open: &mut Option<Draft>, drafts: &mut Vec<Draft>) {
    if let Some(d) = open.take().filter(|d| !d.is_empty()) {
        drafts.push(d);
    }
}

fn fallback(output: &str, section: Option<usize>) -> Finding {
    let raw = output.trim();
    let message = if raw.is_empty() {
        EMPTY_OUTPUT_NOTICE.to_string()
    } else {
        raw.to_string()
    };
    let rule = rule_for(Category::Clarity);
    let quoted_excerpt = extract_excerpt(&message);
    let message = with_section(section, message);

    Finding {
        id: finding_id(section, 0, &message),
        category: rule.category,
        severity: Severity::Low,
        message,
        quoted_excerpt,
        regulation_ref: None,
        recommendation: Some(FALLBACK_RECOMMENDATION.to_string()),
    }
}

fn with_section(section: Option<usize>, message: String) -> String {
    match section {
        Some(n) => format!("[Section {n}]: {message}"),
        None => message,
    }
}

fn finding_id(section: Option<usize>, ordinal: usize, message: &str) -> FindingId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{ordinal}:", section.unwrap_or(0)).as_bytes());
    hasher.update(message.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    FindingId(format!("f-{}", &hash[..12]))
}

fn is_placeholder(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().trim_end_matches('.'),
        "" | "n/a" | "na" | "none" | "not applicable" | "-"
    )
}

/// Lines, with markdown bold removed, split at inline category labels.
fn segments(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.replace("**", ""))
        .flat_map(|l| {
            split_inline_labels(&l)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Splits before every category label (`Clarity:`) that follows whitespace,
/// sits outside a quoted passage and either is capitalized or opens a
/// sentence. "the document structure: ..." stays in one piece.
fn split_inline_labels(line: &str) -> Vec<&str> {
    let mut cuts = vec![0usize];
    let mut in_straight = false;
    let mut in_curly = false;
    let mut prev_ws = false;
    let mut last_visible: Option<char> = None;

    for (i, c) in line.char_indices() {
        let starts_label = i > 0
            && prev_ws
            && !in_straight
            && !in_curly
            && (c.is_uppercase() || last_visible.is_some_and(ends_sentence))
            && label_at(&line[i..]).is_some();
        if starts_label {
            cuts.push(i);
        }
        match c {
            '"' if !in_curly => in_straight = !in_straight,
            '“' if !in_straight => in_curly = true,
            '”' if !in_straight => in_curly = false,
            _ => {}
        }
        prev_ws = c.is_whitespace();
        if !prev_ws {
            last_visible = Some(c);
        }
    }
    cuts.push(line.len());

    cuts.windows(2)
        .map(|w| line[w[0]..w[1]].trim())
        .filter(|s| !s.is_empty())
        .collect()
}

fn ends_sentence(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ';' | '"' | '”' | ')')
}

/// Drops leading markdown headings, bullets and `1.` / `1)` numbering.
fn strip_list_marker(s: &str) -> &str {
    let s = s.trim().trim_start_matches('#').trim_start();

    let separated = |rest: &str| rest.is_empty() || rest.starts_with(char::is_whitespace);

    if let Some(rest) = s.strip_prefix(['-', '*', '•', '+']).filter(|r| separated(r)) {
        return rest.trim();
    }

    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if (1..=3).contains(&digits) {
        if let Some(rest) = s[digits..].strip_prefix(['.', ')']).filter(|r| separated(r)) {
            return rest.trim();
        }
    }
    s
}
