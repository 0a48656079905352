//! Quoted-excerpt extraction.
//!
//! The first `"..."` (or `“...”`) span of a message is the excerpt. Quotes
//! elided with `...`/`…` cannot be located verbatim, so only the part before
//! the ellipsis is kept when it is long enough to be meaningful.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

/// Minimum length (chars) of the text before an ellipsis for it to replace the quote.
pub const MIN_TRUNCATED_PREFIX_CHARS: usize = 10;

static QUOTE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ELLIPSIS_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn quote_re() -> Option<&'static Regex> {
    QUOTE_RE
        .get_or_init(|| Regex::new(r#""([^"]+)"|“([^”]+)”"#).ok())
        .as_ref()
}

fn ellipsis_re() -> Option<&'static Regex> {
    ELLIPSIS_RE
        .get_or_init(|| Regex::new(r"\.{3,}|…").ok())
        .as_ref()
}

/// First quoted span of `message`, with truncation recovery applied.
pub fn extract_excerpt(message: &str) -> Option<String> {
    let caps = quote_re()?.captures(message)?;
    let quoted = caps.get(1).or_else(|| caps.get(2))?.as_str();
    clean_excerpt(quoted)
}

/// Normalizes an excerpt given directly (field line or already unquoted text).
pub fn clean_excerpt(raw: &str) -> Option<String> {
    let quoted = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '“' || c == '”')
        .trim();
    if quoted.is_empty() {
        return None;
    }

    let Some(re) = ellipsis_re() else {
        return Some(quoted.to_string());
    };
    if !re.is_match(quoted) {
        return Some(quoted.to_string());
    }

    warn!(excerpt = %quoted, "quoted excerpt looks truncated");
    let before = re.split(quoted).next().unwrap_or_default().trim();
    if before.chars().count() > MIN_TRUNCATED_PREFIX_CHARS {
        debug!(excerpt = %before, "using text before the ellipsis");
        Some(before.to_string())
    } else {
        Some(quoted.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn takes_the_first_quote() {
        let m = r#"Vague. "first quote" and "second""#;
        assert_eq!(extract_excerpt(m).as_deref(), Some("first quote"));
    }

    #[test]
    fn accepts_curly_quotes() {
        assert_eq!(extract_excerpt("See “the Vendor shall”.").as_deref(), Some("the Vendor shall"));
    }

    #[test]
    fn truncated_quote_keeps_the_prefix() {
        let m = r#"Issue: "personal data in accordance...""#;
        assert_eq!(extract_excerpt(m).as_deref(), Some("personal data in accordance"));
        let m = r#""personal data … law""#;
        assert_eq!(extract_excerpt(m).as_deref(), Some("personal data"));
    }

    #[test]
    fn short_prefix_keeps_the_whole_quote() {
        let m = r#""The... end""#;
        assert_eq!(extract_excerpt(m).as_deref(), Some("The... end"));
    }

    #[test]
    fn no_quote_no_excerpt() {
        assert_eq!(extract_excerpt("nothing quoted"), None);
        assert_eq!(clean_excerpt(r#" "" "#), None);
    }
}
