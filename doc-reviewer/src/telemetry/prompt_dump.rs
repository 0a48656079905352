//! Prompt telemetry: optional dumping of the exact prompts and responses.
//!
//! ## What it does
//! - Writes each request/response pair to
//!   `<dir>/<run_id>/<stage>/<idx>_{prompt,response}.txt`.
//! - Emits a concise DEBUG line (length, token estimate, file path).
//! - Optionally **redacts** e-mail addresses and phone-like numbers, since
//!   reviewed documents routinely contain personal data.
//! - Supports truncation for huge prompts.
//!
//! ## Env flags
//! - `DOC_REVIEWER_LOG_PROMPTS` (bool): enable dumping (default: false)
//! - `DOC_REVIEWER_PROMPT_DIR` (path): base directory (default: `review_data/prompts`)
//! - `DOC_REVIEWER_PROMPT_REDACT` (bool): redact personal data (default: true)
//! - `DOC_REVIEWER_PROMPT_MAX_CHARS` (usize): 0 = no truncation (default: 0)
//!
//! Failures are logged and never interrupt a review.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::budget::estimate_tokens;

const DEFAULT_DIR: &str = "review_data/prompts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDumpConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub redact: bool,
    pub max_chars: usize,
}

impl Default for PromptDumpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(DEFAULT_DIR),
            redact: true,
            max_chars: 0,
        }
    }
}

impl PromptDumpConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Lenient: malformed values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            enabled: lookup("DOC_REVIEWER_LOG_PROMPTS").is_some_and(|v| is_truthy(&v)),
            dir: lookup("DOC_REVIEWER_PROMPT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(d.dir),
            redact: lookup("DOC_REVIEWER_PROMPT_REDACT").map_or(d.redact, |v| is_truthy(&v)),
            max_chars: lookup("DOC_REVIEWER_PROMPT_MAX_CHARS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(d.max_chars),
        }
    }
}

/// Returns `true` for "1", "true", "yes", "on" (any case).
fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Dumps the exchanges of one review run.
#[derive(Debug, Clone)]
pub struct PromptDumper {
    cfg: PromptDumpConfig,
    run_id: String,
}

impl PromptDumper {
    pub fn new(cfg: PromptDumpConfig, run_id: impl Into<String>) -> Self {
        Self {
            cfg,
            run_id: run_id.into(),
        }
    }

    /// Dumper configured from the environment, with a timestamped run id.
    pub fn from_env() -> Self {
        let run_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string();
        Self::new(PromptDumpConfig::from_env(), run_id)
    }

    /// `<dir>/<run_id>/<stage>`
    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.cfg.dir.join(&self.run_id).join(sanitize(stage))
    }

    /// Writes prompt (and response, when present) for request `idx` of `stage`.
    pub fn dump(&self, stage: &str, idx: usize, prompt: &str, response: Option<&str>) {
        if !self.cfg.enabled {
            return;
        }

        let dir = self.stage_dir(stage);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "prompt dump disabled for this request");
            return;
        }

        let (prompt_out, truncated) = self.prepare(prompt);
        let file = dir.join(format!("{idx:03}_prompt.txt"));
        write_logged(&file, &prompt_out);
        debug!(
            "prompt[{}] idx={} file={} len={} tokens≈{} truncated={}",
            stage,
            idx,
            file.display(),
            prompt_out.chars().count(),
            estimate_tokens(prompt),
            truncated
        );

        if let Some(resp) = response {
            let (resp_out, _) = self.prepare(resp);
            write_logged(&dir.join(format!("{idx:03}_response.txt")), &resp_out);
        }
    }

    fn prepare(&self, s: &str) -> (String, bool) {
        let content = if self.cfg.redact {
            redact_personal_data(s)
        } else {
            s.to_string()
        };
        maybe_truncate(content, self.cfg.max_chars)
    }
}

fn write_logged(file: &Path, content: &str) {
    if let Err(e) = fs::write(file, content) {
        warn!(file = %file.display(), error = %e, "failed to write prompt dump");
    }
}

/// Safe file-name segment.
fn sanitize(s: &str) -> String {
    let out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() { "-".to_string() } else { out }
}

static REDACT_RES: OnceLock<Vec<Regex>> = OnceLock::new();

/// Best-effort redaction of e-mail addresses and phone-like numbers.
fn redact_personal_data(s: &str) -> String {
    let pats = REDACT_RES.get_or_init(|| {
        [
            r"(?i)\b[A-Z0-9._%+\-]+@[A-Z0-9.\-]+\.[A-Z]{2,}\b",
            r"\+?\d[\d \-().]{7,}\d",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });
    pats.iter().fold(s.to_string(), |acc, re| {
        re.replace_all(&acc, "[REDACTED]").into_owned()
    })
}

/// Optionally truncates to at most `max_chars`, keeping a suffix note.
fn maybe_truncate(s: String, max_chars: usize) -> (String, bool) {
    if max_chars == 0 || s.chars().count() <= max_chars {
        return (s, false);
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("\n\n[... TRUNCATED ...]\n");
    (out, true)
}
