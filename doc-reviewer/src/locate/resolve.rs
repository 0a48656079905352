//! Quoted-excerpt resolution against the current flattened text.
//!
//! Tiers, first success wins:
//! 1. exact: verbatim first occurrence;
//! 2. recovered: the longest run of excerpt words found contiguously in the
//!    text (case, punctuation and whitespace differences tolerated), trying
//!    shorter windows down to two words;
//! 3. fuzzy: the single longest excerpt word;
//! 4. otherwise `None`.
//!
//! Only words longer than [`MIN_WORD_CHARS`] anchor a phrase: a window must
//! start and end on one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::char_slice;

/// Words must be longer than this (in chars) to anchor a match.
pub const MIN_WORD_CHARS: usize = 3;

/// How a span was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Exact,
    Recovered,
    Fuzzy,
    Unresolved,
}

/// Char range in the flattened text believed to match an excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSpan {
    pub start: usize,
    pub end: usize,
    /// Text actually found at `start..end`; may differ from the excerpt.
    pub matched_text: String,
    pub confidence: Confidence,
}

/// Resolves `excerpt` against `flattened`. `None` means "cannot anchor".
pub fn resolve(excerpt: &str, flattened: &str) -> Option<ResolvedSpan> {
    let excerpt = excerpt.trim();
    if excerpt.is_empty() || flattened.is_empty() {
        return None;
    }

    if let Some(b) = flattened.find(excerpt) {
        let start = flattened[..b].chars().count();
        return Some(ResolvedSpan {
            start,
            end: start + excerpt.chars().count(),
            matched_text: excerpt.to_string(),
            confidence: Confidence::Exact,
        });
    }

    let words = tokenize(excerpt);
    let text = tokenize(flattened);
    let index = TokenIndex::new(&text);

    let span = recover_phrase(&words, &text, &index)
        .map(|(s, e)| (s, e, Confidence::Recovered))
        .or_else(|| {
            longest_word(&words, flattened, &text, &index).map(|(s, e)| (s, e, Confidence::Fuzzy))
        });

    match span {
        Some((start, end, confidence)) => {
            let matched_text = char_slice(flattened, start..end)?.to_string();
            debug!(?confidence, start, end, matched = %matched_text, "excerpt resolved approximately");
            Some(ResolvedSpan {
                start,
                end,
                matched_text,
                confidence,
            })
        }
        None => {
            debug!(excerpt = %excerpt, "excerpt unresolved");
            None
        }
    }
}

/// A word with surrounding punctuation stripped; offsets are chars.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    norm: String,
    start: usize,
    end: usize,
}

impl Token {
    fn is_long(&self) -> bool {
        self.end - self.start > MIN_WORD_CHARS
    }
}

/// Whitespace-separated words, trimmed to their first..last alphanumeric char.
/// Pure-punctuation words are dropped.
fn tokenize(text: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut word: Vec<(usize, char)> = Vec::new();

    let mut flush = |word: &mut Vec<(usize, char)>| {
        let first = word.iter().position(|(_, c)| c.is_alphanumeric());
        let last = word.iter().rposition(|(_, c)| c.is_alphanumeric());
        if let (Some(f), Some(l)) = (first, last) {
            out.push(Token {
                norm: word[f..=l].iter().flat_map(|(_, c)| c.to_lowercase()).collect(),
                start: word[f].0,
                end: word[l].0 + 1,
            });
        }
        word.clear();
    };

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            flush(&mut word);
        } else {
            word.push((i, c));
        }
    }
    flush(&mut word);
    out
}

/// Text-token positions by normalized word, ascending.
struct TokenIndex<'a> {
    positions: HashMap<&'a str, Vec<usize>>,
}

impl<'a> TokenIndex<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, t) in tokens.iter().enumerate() {
            positions.entry(t.norm.as_str()).or_default().push(i);
        }
        Self { positions }
    }

    /// First text position where `window` occurs as consecutive tokens.
    fn find(&self, window: &[Token], text: &[Token]) -> Option<usize> {
        let first = window.first()?;
        self.positions.get(first.norm.as_str())?.iter().copied().find(|&k| {
            k + window.len() <= text.len()
                && window
                    .iter()
                    .zip(&text[k..])
                    .all(|(w, t)| w.norm == t.norm)
        })
    }
}

fn recover_phrase(words: &[Token], text: &[Token], index: &TokenIndex<'_>) -> Option<(usize, usize)> {
    if words.iter().filter(|w| w.is_long()).count() < 2 {
        return None;
    }

    for size in (2..=words.len()).rev() {
        for window in words.windows(size) {
            let anchored = window.first().is_some_and(Token::is_long)
                && window.last().is_some_and(Token::is_long);
            if !anchored {
                continue;
            }
            if let Some(k) = index.find(window, text) {
                return Some((text[k].start, text[k + size - 1].end));
            }
        }
    }
    None
}

/// First longest word of the excerpt: as a whole word first, else as a substring.
fn longest_word(
    words: &[Token],
    flattened: &str,
    text: &[Token],
    index: &TokenIndex<'_>,
) -> Option<(usize, usize)> {
    let longest = words
        .iter()
        .filter(|w| w.is_long())
        .fold(None::<&Token>, |best, w| match best {
            Some(b) if b.end - b.start >= w.end - w.start => Some(b),
            _ => Some(w),
        })?;

    if let Some(k) = index.find(std::slice::from_ref(longest), text) {
        return Some((text[k].start, text[k].end));
    }

    let needle = longest.norm.as_str();
    let haystack = flattened.to_lowercase();
    // Lowercasing may change lengths for some scripts; only trust it when it does not.
    if haystack.chars().count() != flattened.chars().count() {
        return None;
    }
    let b = haystack.find(needle)?;
    let start = haystack[..b].chars().count();
    Some((start, start + needle.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "The vendor shall process personal data in accordance with applicable law. This clause is ambiguous.";

    #[test]
    fn verbatim_excerpt_is_exact_at_first_occurrence() {
        let span = resolve("This clause is ambiguous.", TEXT).unwrap();
        assert_eq!(span.confidence, Confidence::Exact);
        assert_eq!((span.start, span.end), (74, 99));

        let span = resolve("ab", "xx ab ab").unwrap();
        assert_eq!(span.start, 3);
    }

    #[test]
    fn altered_last_word_is_recovered() {
        let span = resolve("process personal data in accordance with applicable statutes", TEXT).unwrap();
        assert_eq!(span.confidence, Confidence::Recovered);
        assert_eq!(span.matched_text, "process personal data in accordance with applicable");
        assert_eq!(span.start, 17);
    }

    #[test]
    fn case_and_whitespace_drift_is_recovered() {
        let span = resolve("The  VENDOR shall\nprocess", TEXT).unwrap();
        assert_eq!(span.confidence, Confidence::Recovered);
        assert_eq!(span.matched_text, "vendor shall process");
    }

    #[test]
    fn single_longest_word_is_fuzzy() {
        let span = resolve("unrelated accordance", TEXT).unwrap();
        assert_eq!(span.confidence, Confidence::Fuzzy);
        assert_eq!(span.matched_text, "accordance");
    }

    #[test]
    fn nothing_found_is_none() {
        assert_eq!(resolve("zzz-not-present", TEXT), None);
        assert_eq!(resolve("", TEXT), None);
        assert_eq!(resolve("a an the", TEXT), None);
    }

    #[test]
    fn offsets_are_chars_not_bytes() {
        let text = "Préambule: données personnelles traitées";
        let span = resolve("données personnelles", text).unwrap();
        assert_eq!((span.start, span.end), (11, 31));
        let span = resolve("Données personnelles traitées!", text).unwrap();
        assert_eq!(span.confidence, Confidence::Recovered);
        assert_eq!(span.matched_text, "données personnelles traitées");
    }
}
