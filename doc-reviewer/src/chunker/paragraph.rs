//! Fallback chunker: greedy paragraph packing.
//!
//! Whole paragraphs are appended to the current chunk until the next one would
//! exceed the budget. Chunks are contiguous slices of the input, so offsets are
//! exact and there is never any overlap. A paragraph larger than the budget is
//! emitted on its own, untruncated.

use crate::budget::estimate_tokens;

use super::Chunk;

/// Packs the paragraphs of `text` into chunks of at most `max_tokens`.
pub fn split(text: &str, max_tokens: usize) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (s, e) in paragraph_bounds(text) {
        current = match current {
            Some((cs, _)) if estimate_tokens(&text[cs..e]) <= max_tokens => Some((cs, e)),
            Some((cs, ce)) => {
                out.push(slice_chunk(text, cs, ce));
                Some((s, e))
            }
            None => Some((s, e)),
        };
    }

    if let Some((cs, ce)) = current {
        out.push(slice_chunk(text, cs, ce));
    }
    out
}

/// Byte bounds of non-blank paragraphs, with surrounding whitespace trimmed.
fn paragraph_bounds(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut pos = 0;
    for para in text.split("\n\n") {
        let lead = para.len() - para.trim_start().len();
        let body = para.trim();
        if !body.is_empty() {
            out.push((pos + lead, pos + lead + body.len()));
        }
        pos += para.len() + 2;
    }
    out
}

fn slice_chunk(text: &str, start: usize, end: usize) -> Chunk {
    let start_char = text[..start].chars().count();
    let body = &text[start..end];
    Chunk {
        text: body.to_string(),
        offsets: Some(start_char..start_char + body.chars().count()),
    }
}
