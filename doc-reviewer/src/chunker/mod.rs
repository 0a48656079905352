//! Semantic chunking of long documents.
//!
//! The recursive splitter is tried first; if it rejects the parameters the
//! paragraph packer takes over. Recursive chunks carry the position the
//! splitter cut them from; only when the text is not found there is it
//! searched for, moving a cursor forward so repeated passages resolve to the
//! right occurrence where possible.

pub mod paragraph;
pub mod recursive;

use std::ops::Range;

use recursive::SplitChunk;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One slice of the document sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Char range in the source text; `None` when the text could not be found back.
    pub offsets: Option<Range<usize>>,
}

/// Chunking parameters (token budgets are estimated, see [`crate::budget`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub max_chunk_tokens: usize,
    pub overlap_tokens: usize,
    /// Chunks shorter than this are folded into a neighbour.
    pub min_chunk_chars: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 1500,
            overlap_tokens: 64,
            min_chunk_chars: 50,
        }
    }
}

/// Splits `text` into review chunks. Empty or blank input yields no chunks.
pub fn chunk_document(text: &str, params: &ChunkParams) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    match recursive::split(
        text,
        params.max_chunk_tokens,
        params.overlap_tokens,
        params.min_chunk_chars,
    ) {
        Ok(texts) => {
            let chunks = attach_offsets(text, texts);
            debug!(
                chunks = chunks.len(),
                without_offsets = chunks.iter().filter(|c| c.offsets.is_none()).count(),
                "recursive chunking done"
            );
            chunks
        }
        Err(e) => {
            warn!(error = %e, "recursive chunking rejected; falling back to paragraph packing");
            let chunks = paragraph::split(text, params.max_chunk_tokens.max(1));
            debug!(chunks = chunks.len(), "paragraph chunking done");
            chunks
        }
    }
}

/// Char offsets for each chunk.
///
/// The splitter's own start position is used when the chunk text sits there.
/// Otherwise the text is searched for: forward from just after the previous
/// chunk's start (chunks overlap, so the next one may begin before the
/// previous one ends), then anywhere.
fn attach_offsets(source: &str, pieces: Vec<SplitChunk>) -> Vec<Chunk> {
    let mut cursor = 0usize; // byte position
    let mut out = Vec::with_capacity(pieces.len());

    for (i, SplitChunk { text, byte_start }) in pieces.into_iter().enumerate() {
        let exact = source
            .get(byte_start..)
            .is_some_and(|rest| rest.starts_with(text.as_str()));
        let found = if exact {
            Some(byte_start)
        } else {
            debug!(chunk = i, byte_start, "chunk not at its split position; searching");
            source
                .get(cursor..)
                .and_then(|rest| rest.find(text.as_str()))
                .map(|p| cursor + p)
                .or_else(|| source.find(text.as_str()))
        };

        let offsets = match found {
            Some(b) => {
                cursor = b + source[b..].chars().next().map_or(1, char::len_utf8);
                let start = source[..b].chars().count();
                Some(start..start + text.chars().count())
            }
            None => {
                warn!(chunk = i, len = text.len(), "chunk text not found in source; offsets unknown");
                None
            }
        };

        out.push(Chunk { text, offsets });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(max: usize, overlap: usize) -> ChunkParams {
        ChunkParams {
            max_chunk_tokens: max,
            overlap_tokens: overlap,
            min_chunk_chars: 0,
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_document("", &ChunkParams::default()).is_empty());
        assert!(chunk_document("  \n ", &ChunkParams::default()).is_empty());
    }

    #[test]
    fn offsets_point_back_into_the_source() {
        let text = "First clause here.\n\nSecond clause here.\n\nThird clause here.";
        let chunks = chunk_document(text, &params(8, 0));
        assert!(chunks.len() > 1);
        for c in &chunks {
            let r = c.offsets.clone().unwrap();
            let slice: String = text.chars().skip(r.start).take(r.len()).collect();
            assert_eq!(slice, c.text);
        }
    }

    fn piece(text: &str, byte_start: usize) -> SplitChunk {
        SplitChunk {
            text: text.to_string(),
            byte_start,
        }
    }

    #[test]
    fn split_position_wins_over_first_occurrence() {
        let chunks = attach_offsets("same same same", vec![piece("same", 0), piece("same", 10)]);
        assert_eq!(chunks[0].offsets, Some(0..4));
        assert_eq!(chunks[1].offsets, Some(10..14));
    }

    #[test]
    fn misplaced_text_is_searched_forward() {
        let chunks = attach_offsets("same same", vec![piece("same", 0), piece("same", 99)]);
        assert_eq!(chunks[1].offsets, Some(5..9));
    }

    #[test]
    fn unknown_chunk_text_has_no_offsets() {
        let chunks = attach_offsets("abc", vec![piece("zzz", 0)]);
        assert_eq!(chunks[0].offsets, None);
    }

    #[test]
    fn invalid_overlap_falls_back_to_paragraphs() {
        let text = "one two three\n\nfour five six";
        let chunks = chunk_document(text, &params(5, 9));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].offsets, Some(15..28));
    }
}
