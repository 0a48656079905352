//! Findings: the typed form of the model's free-form review text.

pub mod classify;
pub mod excerpt;
pub mod parser;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use parser::{parse_findings, parse_findings_in_section};

/// Opaque finding identifier, unique within one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingId(pub String);

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of problem a finding reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Compliance,
    LegalRisk,
    DataProtection,
    Regulatory,
    Clarity,
    Structure,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Compliance => "compliance",
            Category::LegalRisk => "legal_risk",
            Category::DataProtection => "data_protection",
            Category::Regulatory => "regulatory",
            Category::Clarity => "clarity",
            Category::Structure => "structure",
        }
    }

    /// Human label, as the model is asked to write it (`Data Protection`).
    pub fn label(self) -> &'static str {
        match self {
            Category::Compliance => "Compliance",
            Category::LegalRisk => "Legal Risk",
            Category::DataProtection => "Data Protection",
            Category::Regulatory => "Regulatory",
            Category::Clarity => "Clarity",
            Category::Structure => "Structure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Reads a severity word out of free text (`"High - needs action"`).
    /// Only whole words count; the most severe one wins when several appear.
    pub fn from_text(s: &str) -> Option<Self> {
        severity_word_re()?
            .find_iter(s)
            .filter_map(|m| match m.as_str().to_lowercase().as_str() {
                "critical" => Some(Severity::Critical),
                "high" => Some(Severity::High),
                "medium" | "moderate" => Some(Severity::Medium),
                "low" => Some(Severity::Low),
                _ => None,
            })
            .max()
    }
}

fn severity_word_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(critical|high|medium|moderate|low)\b").ok())
        .as_ref()
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewer observation. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    /// Substring the model claims appears verbatim in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}
