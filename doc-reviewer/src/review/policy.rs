//! Post-processing policy for aggregated findings.
//!
//! Chunks overlap, so the same passage can be reported twice. Nothing is
//! removed by default; [`DedupPolicy::SameExcerpt`] is an explicit opt-in.

use std::collections::HashSet;
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::findings::{Category, Finding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Keep every finding.
    #[default]
    Off,
    /// Drop later findings with the same category and quoted excerpt.
    SameExcerpt,
}

impl FromStr for DedupPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "none" => Ok(DedupPolicy::Off),
            "excerpt" | "same_excerpt" | "same-excerpt" => Ok(DedupPolicy::SameExcerpt),
            other => Err(ConfigError::InvalidValue {
                var: "DOC_REVIEW_DEDUP",
                value: other.to_string(),
            }),
        }
    }
}

/// Applies `policy` in place, keeping the first occurrence and the original order.
/// Findings without an excerpt are never dropped.
pub fn dedup_in_place(findings: &mut Vec<Finding>, policy: DedupPolicy) {
    if policy == DedupPolicy::Off {
        return;
    }

    let mut seen: HashSet<(Category, String)> = HashSet::new();
    findings.retain(|f| match f.quoted_excerpt.as_deref() {
        Some(q) => seen.insert((f.category, normalize_excerpt(q))),
        None => true,
    });
}

fn normalize_excerpt(q: &str) -> String {
    q.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
