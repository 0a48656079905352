//! Recursive boundary splitter.
//!
//! Splits on the coarsest separator present in the text, recurses into pieces
//! that are still over budget with the remaining (finer) separators, then packs
//! adjacent pieces into chunks with a trailing-context overlap.
//!
//! Separators are kept at the start of the piece that follows them, so the
//! pieces ("atoms") concatenate back to the input. Chunks are ranges over the
//! atom list; that makes it possible to fold a too-small chunk into its
//! neighbour without duplicating overlap text.

use std::collections::VecDeque;
use std::ops::Range;

use crate::budget::tokens_to_chars;
use crate::errors::ChunkError;

/// Boundaries from coarsest to finest. The empty separator means "any char".
pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " ", ""];

/// Splits `text` into chunk texts of at most `max_tokens` (estimated), where
/// each chunk after the first starts with up to `overlap_tokens` of the previous
/// chunk's tail. Chunks shorter than `min_chars` are folded into a neighbour.
///
/// Returned texts are trimmed; whitespace-only chunks are omitted.
pub fn split(
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    min_chars: usize,
) -> Result<Vec<SplitChunk>, ChunkError> {
    if max_tokens == 0 {
        return Err(ChunkError::ZeroBudget);
    }
    if overlap_tokens >= max_tokens {
        return Err(ChunkError::OverlapTooLarge {
            overlap: overlap_tokens,
            max: max_tokens,
        });
    }

    let mut splitter = Splitter {
        max_chars: tokens_to_chars(max_tokens),
        overlap_chars: tokens_to_chars(overlap_tokens),
        atoms: Vec::new(),
        docs: Vec::new(),
    };
    splitter.split_rec(text, SEPARATORS);

    let docs = fold_small(&splitter.atoms, splitter.docs, min_chars);
    let starts: Vec<usize> = splitter
        .atoms
        .iter()
        .scan(0usize, |at, atom| {
            let start = *at;
            *at += atom.len();
            Some(start)
        })
        .collect();

    Ok(docs
        .into_iter()
        .filter_map(|r| {
            let raw = splitter.atoms[r.clone()].concat();
            let text = raw.trim();
            (!text.is_empty()).then(|| SplitChunk {
                byte_start: starts[r.start] + (raw.len() - raw.trim_start().len()),
                text: text.to_string(),
            })
        })
        .collect())
}

/// Trimmed chunk text and where it starts in the input (bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitChunk {
    pub text: String,
    pub byte_start: usize,
}

struct Splitter<'a> {
    max_chars: usize,
    overlap_chars: usize,
    /// Pieces in document order; their concatenation is the input text.
    atoms: Vec<&'a str>,
    /// Chunks as ranges of atom indices. Ranges may overlap.
    docs: Vec<Range<usize>>,
}

impl<'a> Splitter<'a> {
    fn split_rec(&mut self, text: &'a str, separators: &[&str]) {
        let (sep, finer) = pick_separator(text, separators);

        let mut good_start: Option<usize> = None;
        for piece in split_keep_start(text, sep) {
            if char_len(piece) <= self.max_chars {
                self.atoms.push(piece);
                good_start.get_or_insert(self.atoms.len() - 1);
                continue;
            }

            if let Some(start) = good_start.take() {
                self.merge(start..self.atoms.len());
            }
            if finer.is_empty() {
                // Unsplittable; emit as is.
                self.atoms.push(piece);
                let i = self.atoms.len() - 1;
                self.docs.push(i..i + 1);
            } else {
                self.split_rec(piece, finer);
            }
        }

        if let Some(start) = good_start {
            self.merge(start..self.atoms.len());
        }
    }

    /// Packs `atoms[run]` greedily up to `max_chars`, carrying at most
    /// `overlap_chars` of trailing atoms into the next chunk.
    fn merge(&mut self, run: Range<usize>) {
        let mut window: VecDeque<usize> = VecDeque::new();
        let mut total = 0usize;

        for i in run {
            let len = char_len(self.atoms[i]);
            if total + len > self.max_chars && !window.is_empty() {
                self.push_window(&window);
                while total > self.overlap_chars || (total + len > self.max_chars && total > 0) {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(self.atoms[front]);
                }
            }
            window.push_back(i);
            total += len;
        }

        if !window.is_empty() {
            self.push_window(&window);
        }
    }

    fn push_window(&mut self, window: &VecDeque<usize>) {
        if let (Some(&first), Some(&last)) = (window.front(), window.back()) {
            self.docs.push(first..last + 1);
        }
    }
}

/// First separator present in `text` (the empty one always matches), together
/// with the finer separators left for recursion.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Splits on `sep`, keeping each separator at the start of the following piece.
/// Empty pieces are dropped; the empty separator splits into single chars.
fn split_keep_start<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    if sep.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut out = Vec::new();
    let mut last = 0;
    for (i, _) in text.match_indices(sep) {
        if i > last {
            out.push(&text[last..i]);
        }
        last = i;
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
    out
}

/// Folds chunks under `min_chars` into the preceding chunk, or into the
/// following one when there is no predecessor.
fn fold_small(atoms: &[&str], docs: Vec<Range<usize>>, min_chars: usize) -> Vec<Range<usize>> {
    let size = |r: &Range<usize>| char_len(atoms[r.clone()].concat().trim());

    let mut out: Vec<Range<usize>> = Vec::with_capacity(docs.len());
    let mut pending: Option<Range<usize>> = None;

    for doc in docs {
        let doc = match pending.take() {
            Some(p) => p.start.min(doc.start)..p.end.max(doc.end),
            None => doc,
        };
        if size(&doc) >= min_chars {
            out.push(doc);
            continue;
        }
        match out.last_mut() {
            Some(prev) => prev.end = prev.end.max(doc.end),
            None => pending = Some(doc),
        }
    }

    // Only small text overall: keep it as a single chunk.
    if let Some(p) = pending {
        out.push(p);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
