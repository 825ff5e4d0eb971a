//! Boundary-aware overlapping text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters
//! where consecutive chunks share exactly `chunk_overlap` characters, so a
//! sentence cut at one boundary is still whole in one of its neighbours.
//!
//! # Algorithm
//!
//! 1. Take a window of `chunk_size` characters starting at the cursor.
//! 2. If the window reaches the end of the text, emit it and stop.
//! 3. Otherwise cut after the last paragraph break (`\n\n`) in the window,
//!    else the last line break, else the last sentence end (`. `, `! `,
//!    `? `), else the last whitespace. A cut is only accepted if the chunk
//!    keeps more than `chunk_overlap` characters, which guarantees progress.
//! 4. With no acceptable boundary, hard-cut at the window end (always on a
//!    UTF-8 character boundary).
//! 5. Move the cursor back `chunk_overlap` characters from the cut and
//!    repeat.
//!
//! Chunks are never trimmed: dropping the first `chunk_overlap` characters
//! of every chunk after the first and concatenating reproduces the input.
//!
//! # Example
//!
//! ```rust
//! use rag_chat::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(1000, 200);
//! let chunks = splitter.split("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks.len(), 1);
//! assert!(splitter.split("").is_empty());
//! ```

use std::ops::Range;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Separators tried in order of preference; the cut lands after the separator.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? "];

/// Splits text into bounded, overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunk strings, in order.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect()
    }

    /// Split `text` into byte ranges, in order.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;

        loop {
            let window_end = advance_chars(text, start, self.chunk_size);
            if window_end >= text.len() {
                spans.push(start..text.len());
                break;
            }

            let min_end = advance_chars(text, start, self.overlap + 1);
            let end = find_cut(&text[..window_end], start, min_end).unwrap_or(window_end);
            spans.push(start..end);

            start = retreat_chars(text, end, self.overlap);
        }

        spans
    }

    /// Split a document into [`Chunk`]s with contiguous indices from 0.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(&doc.hash, i as i64, text))
            .collect()
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

/// Find the preferred cut inside `window[start..]` that is at least `min_end`.
fn find_cut(window: &str, start: usize, min_end: usize) -> Option<usize> {
    let region = &window[start..];

    for sep in SEPARATORS {
        if let Some(pos) = region.rfind(sep) {
            let cut = start + pos + sep.len();
            if cut >= min_end {
                return Some(cut);
            }
        }
    }

    region
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(pos, c)| start + pos + c.len_utf8())
        .filter(|cut| *cut >= min_end)
}

/// Byte index `n` characters after `from`, or the end of the text.
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte index `n` characters before `from`, or 0.
fn retreat_chars(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(c);
            } else {
                out.extend(c.chars().skip(overlap));
            }
        }
        out
    }

    fn sample_text() -> String {
        (0..40)
            .map(|i| {
                format!(
                    "Paragraph {} talks about koalas and their eucalyptus diet. \
                     They sleep for most of the day! Do they ever drink water? Rarely.",
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("  \n\n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_exact_size_single_chunk() {
        let splitter = TextSplitter::new(10, 2);
        let chunks = splitter.split("abcdefghij");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let splitter = TextSplitter::new(20, 4);
        let chunks = splitter.split("Alpha beta.\n\nGamma delta epsilon zeta.");
        assert_eq!(chunks[0], "Alpha beta.\n\n");
        assert!(chunks[1].starts_with("a.\n\n"));
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let splitter = TextSplitter::new(20, 5);
        let text = "x".repeat(50);
        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert_eq!(c.chars().count(), 20);
        }
        assert_eq!(rebuild(&chunks, 5), text);
    }

    #[test]
    fn test_chunks_bounded_and_overlapping() {
        let splitter = TextSplitter::default();
        let text = sample_text();
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 1000);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - 200)
                .collect();
            let head: String = pair[1].chars().take(200).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_coverage_lossless() {
        let text = sample_text();
        for (size, overlap) in [(1000, 200), (120, 30), (37, 0), (8, 7)] {
            let splitter = TextSplitter::new(size, overlap);
            let chunks = splitter.split(&text);
            assert_eq!(rebuild(&chunks, overlap), text, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Héllo wörld ✓    │\n└──────────────────┘";
        let splitter = TextSplitter::new(7, 2);
        let chunks = splitter.split(text);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 7);
        }
        assert_eq!(rebuild(&chunks, 2), text);
    }

    #[test]
    fn test_deterministic() {
        let splitter = TextSplitter::new(50, 10);
        let text = sample_text();
        assert_eq!(splitter.split(&text), splitter.split(&text));
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let splitter = TextSplitter::new(10, 50);
        assert_eq!(splitter.overlap(), 9);
        let chunks = splitter.split(&"y".repeat(30));
        assert_eq!(rebuild(&chunks, 9), "y".repeat(30));
    }

    #[test]
    fn test_chunk_document_indices_contiguous() {
        let doc = Document::new(&sample_text(), Some("koalas.txt"));
        let chunks = TextSplitter::new(100, 20).chunk_document(&doc);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.document_hash, doc.hash);
        }
    }
}
