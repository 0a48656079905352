//! Token budget estimation.
//!
//! Not a tokenizer: a fixed, conservative characters-per-token ratio that is
//! good enough for threshold decisions (single pass vs. chunked) and for
//! trimming text before a request.

/// Characters per token. Deliberately low so estimates err on the high side.
pub const CHARS_PER_TOKEN: usize = 3;

/// Marker appended to text cut by [`truncate_to_budget`].
pub const TRUNCATION_MARKER: &str = "[Content truncated due to length]";

/// Approximate token count of `text` (`ceil(chars / 3)`).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// `true` when `text` is estimated above `threshold_tokens`.
pub fn should_chunk(text: &str, threshold_tokens: usize) -> bool {
    estimate_tokens(text) > threshold_tokens
}

/// Converts a token budget into a character budget.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}

/// Text after budget truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub was_truncated: bool,
}

/// Trims `text` to roughly `max_tokens`, preferring natural boundaries.
///
/// Cut point, in order of preference: the last paragraph break, then the last
/// sentence end (`.`), provided it lies beyond 80% of the character budget;
/// otherwise a hard cut at the budget. [`TRUNCATION_MARKER`] is appended.
pub fn truncate_to_budget(text: &str, max_tokens: usize) -> Truncated {
    if estimate_tokens(text) <= max_tokens {
        return Truncated {
            text: text.to_string(),
            was_truncated: false,
        };
    }

    let max_chars = tokens_to_chars(max_tokens);
    let cut_byte = text
        .char_indices()
        .nth(max_chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    let head = &text[..cut_byte];
    // 80% of the budget, measured in chars; compared against char positions below.
    let floor = max_chars * 4 / 5;
    let char_pos = |byte: usize| head[..byte].chars().count();

    let text = match (head.rfind("\n\n"), head.rfind('.')) {
        (Some(p), _) if char_pos(p) > floor => format!("{}\n\n{TRUNCATION_MARKER}", &head[..p]),
        (_, Some(s)) if char_pos(s) > floor => format!("{} {TRUNCATION_MARKER}", &head[..=s]),
        _ => format!("{head} {TRUNCATION_MARKER}"),
    };

    Truncated {
        text,
        was_truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("ab"), 1);
        assert_eq!(estimate_tokens("abcd"), 2);
        assert_eq!(estimate_tokens("ééé"), 1);
    }

    #[test]
    fn texts_within_threshold_are_not_chunked() {
        let t = "x".repeat(300);
        assert!(!should_chunk(&t, 100));
        assert!(should_chunk(&format!("{t}y"), 100));
    }

    #[test]
    fn short_text_is_untouched() {
        let t = truncate_to_budget("Short text.", 10);
        assert_eq!(t.text, "Short text.");
        assert!(!t.was_truncated);
    }

    #[test]
    fn prefers_paragraph_break_near_budget() {
        // budget = 10 tokens = 30 chars; break at char 27 (> 24)
        let text = format!("{}\n\n{}", "a".repeat(27), "b".repeat(40));
        let t = truncate_to_budget(&text, 10);
        assert!(t.was_truncated);
        assert_eq!(t.text, format!("{}\n\n{TRUNCATION_MARKER}", "a".repeat(27)));
    }

    #[test]
    fn falls_back_to_sentence_end() {
        let text = format!("{}. {}", "a".repeat(26), "b".repeat(40));
        let t = truncate_to_budget(&text, 10);
        assert_eq!(t.text, format!("{}. {TRUNCATION_MARKER}", "a".repeat(26)));
    }

    #[test]
    fn hard_cut_when_no_boundary_is_close() {
        let text = format!("a. {}", "b".repeat(60));
        let t = truncate_to_budget(&text, 10);
        assert_eq!(t.text, format!("a. {} {TRUNCATION_MARKER}", "b".repeat(27)));
    }
}
