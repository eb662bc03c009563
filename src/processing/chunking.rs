//! Character-window chunking with word-boundary backoff.
//!
//! Long documents are cut into windows of at most `chunk_size` characters. A window that would
//! end inside a word is shortened back to the nearest preceding whitespace so the summarizer
//! sees whole words, and consecutive windows share up to `overlap` characters of context.
//!
//! Two guards keep the cursor moving on hostile input:
//!
//! - a token longer than `chunk_size` (no whitespace to back off to) is hard-cut at the
//!   original window end;
//! - when a backed-off window is no longer than `overlap`, the overlap is skipped for that step
//!   so the next window starts strictly after the current one.
//!
//! Offsets are character positions, so multibyte text never gets sliced mid code point.

use super::types::ChunkingError;

/// A contiguous window over the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position of the chunk in document order.
    pub index: usize,
    /// Character offset where the chunk starts (inclusive).
    pub start: usize,
    /// Character offset where the chunk ends (exclusive).
    pub end: usize,
    /// Borrowed text of the chunk.
    pub text: &'a str,
}

impl Chunk<'_> {
    /// Number of characters in the chunk.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Split `text` into ordered, overlapping chunks of at most `chunk_size` characters.
///
/// Returns an empty vector for empty input. See the module docs for the boundary rules.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk<'_>>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    // byte_offsets[i] is the byte position of character i; the extra slot marks the end.
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = chars.len();

    let mut chunks = Vec::with_capacity(len / (chunk_size - overlap) + 1);
    let mut start = 0;

    while start < len {
        let candidate = start + chunk_size;
        let end = if candidate >= len {
            len
        } else {
            backoff_to_whitespace(&chars, start, candidate)
        };

        chunks.push(Chunk {
            index: chunks.len(),
            start,
            end,
            text: &text[byte_offsets[start]..byte_offsets[end]],
        });

        if end == len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    tracing::trace!(chunks = chunks.len(), chunk_size, overlap, "Split document");
    Ok(chunks)
}

/// Walk back from `candidate` to the nearest whitespace strictly after `start`.
///
/// Falls back to `candidate` when no such whitespace exists.
fn backoff_to_whitespace(chars: &[char], start: usize, candidate: usize) -> usize {
    let mut end = candidate;
    while end > start && !chars[end].is_whitespace() {
        end -= 1;
    }
    if end <= start { candidate } else { end }
}
