//! Page chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`]: splits on paragraphs, then lines, then words, then
//!   characters, merging pieces back into overlapping windows
//! - [`FixedSizeChunker`]: splits by character count with configurable overlap
//!
//! Chunking is per page: chunks never span a page break, so the first chunk
//! of a page has no leading overlap and the last has no trailing overlap.
//! Sizes and overlaps are measured in characters, not bytes.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::{Chunk, Page};

/// A byte offset into a page paired with the slice of page text found there.
pub type Span<'a> = (usize, &'a str);

/// A strategy for splitting pages into chunks.
pub trait Chunker: Send + Sync {
    /// Split one page of text into spans, in reading order.
    ///
    /// Every span is a non-empty slice of `text` together with its byte offset.
    fn split_spans<'a>(&self, text: &'a str) -> Vec<Span<'a>>;

    /// Split one page of text into chunk texts, in reading order.
    fn split_text(&self, text: &str) -> Vec<String> {
        self.split_spans(text).into_iter().map(|(_, span)| span.to_string()).collect()
    }

    /// Split pages into [`Chunk`]s.
    ///
    /// Returns an empty `Vec` if every page is blank. Positions are numbered
    /// continuously across pages.
    fn chunk(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            let stem = page.stem();

            for (start_index, text) in self.split_spans(&page.text) {
                let position = chunks.len();
                let mut metadata = page.metadata.clone();
                metadata.insert("chunk_index".to_string(), position.to_string());
                metadata.insert("page".to_string(), page.page.to_string());

                chunks.push(Chunk {
                    id: format!("{stem}_{}_{position}", page.page),
                    text: text.to_string(),
                    source: page.source.clone(),
                    page: page.page,
                    position,
                    start_index,
                    metadata,
                });
            }
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Trim whitespace from both ends of a span, keeping its offset exact.
fn trim_span((offset, text): Span<'_>) -> Option<Span<'_>> {
    let trimmed_start = text.trim_start();
    let trimmed = trimmed_start.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    Some((offset + text.len() - trimmed_start.len(), trimmed))
}

/// Separators tried in order; the empty separator splits into characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Text is split on the first separator it contains, keeping the separator
/// attached to the following piece. Pieces shorter than `chunk_size` are
/// merged greedily into windows; when a window is emitted, the next one is
/// seeded with the trailing pieces of the previous window whose combined
/// length fits in `chunk_overlap`. Pieces that are too long are split again
/// with the remaining separators. Windows are whitespace-trimmed and empty
/// windows are dropped.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    /// Create a chunker from the sizes in a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `span` into windows. Pieces are always slices of `page`, so a
    /// run of consecutive pieces is itself a slice.
    fn split_recursive<'a>(
        &self,
        page: &'a str,
        span: Span<'a>,
        separators: &[&str],
    ) -> Vec<Span<'a>> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if span.1.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut windows = Vec::new();
        let mut short_pieces = Vec::new();

        for piece in split_keeping_separator(span, separator) {
            if char_len(piece.1) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                windows.extend(self.merge_pieces(page, &short_pieces));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                // Only reachable with chunk_size == 1: a lone character.
                windows.extend(trim_span(piece));
            } else {
                windows.extend(self.split_recursive(page, piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            windows.extend(self.merge_pieces(page, &short_pieces));
        }

        windows
    }

    /// Merge consecutive pieces (each shorter than `chunk_size`) into overlapping windows.
    fn merge_pieces<'a>(&self, page: &'a str, pieces: &[Span<'a>]) -> Vec<Span<'a>> {
        let mut windows = Vec::new();
        let mut current: VecDeque<Span<'a>> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece.1);
            if total + len > self.chunk_size && !current.is_empty() {
                windows.extend(window_of(page, &current));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, front)) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }
            current.push_back(piece);
            total += len;
        }

        windows.extend(window_of(page, &current));
        windows
    }
}

/// The trimmed slice of `page` running from the first to the last piece.
fn window_of<'a>(page: &'a str, pieces: &VecDeque<Span<'a>>) -> Option<Span<'a>> {
    let (start, _) = *pieces.front()?;
    let (last, last_text) = *pieces.back()?;
    trim_span((start, &page[start..last + last_text.len()]))
}

/// Split a span at a separator, attaching each separator to the piece that follows it.
///
/// The empty separator splits into single characters.
fn split_keeping_separator<'a>((offset, text): Span<'a>, separator: &str) -> Vec<Span<'a>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| (offset + i, &text[i..i + c.len_utf8()]))
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push((offset + start, &text[start..pos]));
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push((offset + start, &text[start..]));
    }
    pieces
}

impl Chunker for RecursiveChunker {
    fn split_spans<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, (0, text), &SEPARATORS)
    }
}

/// Splits text into fixed-size character windows with configurable overlap.
///
/// Windows advance by `chunk_size - chunk_overlap` characters and are not
/// trimmed; windows containing only whitespace are skipped.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn split_spans<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = boundaries.len() - 1;
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut spans = Vec::new();
        let mut start = 0;
        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            let window = &text[boundaries[start]..boundaries[end]];
            if !window.trim().is_empty() {
                spans.push((boundaries[start], window));
            }
            if end == char_count {
                break;
            }
            start += step;
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Page {
        Page::new("data/nepal.pdf", 0, 1, text)
    }

    #[test]
    fn short_page_yields_one_chunk_equal_to_text() {
        let chunker = RecursiveChunker::new(1000, 200);
        let chunks = chunker.chunk(&[page("Nepal is a country in South Asia.")]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Nepal is a country in South Asia.");
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[0].id, "nepal_0_0");
    }

    #[test]
    fn blank_input_yields_nothing() {
        let chunker = RecursiveChunker::new(100, 20);
        assert!(chunker.chunk(&[]).is_empty());
        assert!(chunker.chunk(&[page("   \n\n  ")]).is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let chunker = RecursiveChunker::new(30, 0);
        let chunks = chunker.split_text("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn consecutive_windows_share_trailing_words() {
        let chunker = RecursiveChunker::new(20, 10);
        let chunks = chunker.split_text("one two three four five six seven eight");

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0], "one two three four");
        assert_eq!(chunks[1], "four five six seven");
        for pair in chunks.windows(2) {
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(pair[0].contains(first_word), "{pair:?} share no words");
        }
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
    }

    #[test]
    fn long_words_fall_back_to_characters() {
        let chunker = RecursiveChunker::new(4, 1);
        let chunks = chunker.split_text("abcdefghij");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
        assert_eq!(chunks.last().map(|c| c.ends_with('j')), Some(true));
    }

    #[test]
    fn chunks_never_span_pages_and_positions_continue() {
        let chunker = RecursiveChunker::new(1000, 200);
        let pages = [
            Page::new("a.pdf", 0, 2, "Page one text."),
            Page::new("a.pdf", 1, 2, "Page two text."),
        ];
        let chunks = chunker.chunk(&pages);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, 0);
        assert_eq!(chunks[1].page, 1);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].id, "a_1_1");
        assert_eq!(chunks[1].start_index, 0);
    }

    #[test]
    fn start_index_points_at_chunk_text() {
        let text = "alpha beta gamma\n\ndelta epsilon zeta\n\neta theta iota";
        let chunker = RecursiveChunker::new(20, 8);
        for chunk in chunker.chunk(&[page(text)]) {
            assert_eq!(&text[chunk.start_index..chunk.start_index + chunk.text.len()], chunk.text);
        }
    }

    #[test]
    fn repeated_text_keeps_its_own_offset() {
        let chunks = RecursiveChunker::new(2, 1).chunk(&[page("ba a")]);
        let spans: Vec<(usize, &str)> =
            chunks.iter().map(|c| (c.start_index, c.text.as_str())).collect();
        assert_eq!(spans, vec![(0, "ba"), (3, "a")]);
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let chunker = RecursiveChunker::new(5, 2);
        let chunks = chunker.split_text("नेपाल दक्षिण एसिया");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[test]
    fn fixed_size_windows_overlap_exactly() {
        let chunker = FixedSizeChunker::new(4, 2);
        assert_eq!(chunker.split_text("abcdefgh"), vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn fixed_size_handles_multibyte_boundaries() {
        let chunker = FixedSizeChunker::new(2, 0);
        assert_eq!(chunker.split_text("äöü"), vec!["äö", "ü"]);
    }

    #[test]
    fn fixed_size_offsets_are_exact() {
        let text = "abcdefghij";
        let chunks = FixedSizeChunker::new(4, 1).chunk(&[page(text)]);
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_index).collect();
        assert_eq!(starts, vec![0, 3, 6]);
    }
}
