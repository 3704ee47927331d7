//! Character-budgeted chunking with a separator hierarchy.
//!
//! Chunks are contiguous slices of the source text:
//!
//! - Budget: each chunk holds at most `max_size` characters (Unicode scalar values, never
//!   bytes), so a chunk never splits a UTF-8 sequence.
//! - Split points: inside each window the coarsest separator that still leaves room for the
//!   overlap wins. The order is paragraph break, line break, sentence end, word gap, and
//!   finally a hard cut at the character budget.
//! - Overlap: chunk `i + 1` starts exactly `overlap` characters before chunk `i` ends, so a span
//!   that straddles a split point is fully visible in at least one neighbour.
//!
//! [`Chunks`] is a lazy, cloneable iterator; cloning it (or calling [`ChunkingPolicy::chunks`]
//! again) restarts the sequence.

use std::iter::FusedIterator;

use super::types::ChunkingError;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
/// Default characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 1_000;

/// Separator groups from coarsest to finest. Members of one group are equally preferred.
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Validated chunk sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    max_size: usize,
    overlap: usize,
}

impl ChunkingPolicy {
    /// Validate a sizing pair. `overlap` must be strictly smaller than `max_size`.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if overlap >= max_size {
            return Err(ChunkingError::InvalidOverlap { max_size, overlap });
        }
        Ok(Self { max_size, overlap })
    }

    /// Maximum characters per chunk.
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Characters shared between consecutive chunks.
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `text` under this policy.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            max_size: self.max_size,
            overlap: self.overlap,
            start: 0,
            done: text.is_empty(),
        }
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split `text` into overlapping chunks of at most `max_size` characters.
///
/// Fails with [`ChunkingError::InvalidOverlap`] when `overlap >= max_size`. Empty input yields an
/// empty sequence; input no longer than `max_size` yields a single chunk equal to the input.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<Chunks<'_>, ChunkingError> {
    Ok(ChunkingPolicy::new(max_size, overlap)?.chunks(text))
}

/// Iterator over the chunks of one text. See the module docs for the splitting rules.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    max_size: usize,
    overlap: usize,
    /// Byte offset where the next chunk begins.
    start: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.start;
        let window_end = advance_chars(self.text, start, self.max_size);
        if window_end == self.text.len() {
            self.done = true;
            return Some(&self.text[start..]);
        }

        // A split point must leave at least one new character after the overlap.
        let min_end = advance_chars(self.text, start, self.overlap + 1);
        let end = find_split(&self.text[start..window_end], start, min_end).unwrap_or(window_end);

        self.start = retreat_chars(self.text, start, end, self.overlap);
        Some(&self.text[start..end])
    }
}

impl FusedIterator for Chunks<'_> {}

/// Locate the best split point (exclusive byte end) within `window`, which begins at byte
/// `offset` of the full text. Returns `None` when no separator yields an end at or after
/// `min_end`.
fn find_split(window: &str, offset: usize, min_end: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|group| {
        group
            .iter()
            .filter_map(|separator| {
                window
                    .rfind(separator)
                    .map(|position| offset + position + separator.len())
            })
            .filter(|end| *end >= min_end)
            .max()
    })
}

/// Byte offset reached after walking `count` characters forward from `from`, clamped to the end.
fn advance_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(position, _)| from + position)
}

/// Byte offset `count` characters before `end`, never moving before `floor`.
fn retreat_chars(text: &str, floor: usize, end: usize, count: usize) -> usize {
    if count == 0 {
        return end;
    }
    text[floor..end]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map_or(floor, |(position, _)| floor + position)
}
