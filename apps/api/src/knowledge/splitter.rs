//! Recursive character text splitter.
//!
//! Splits on the coarsest separator present (paragraphs, then lines, then words,
//! then characters), recursing into any piece that is still too long, and merges
//! neighbouring pieces back into chunks of at most `chunk_size` characters with
//! `chunk_overlap` characters carried over between consecutive chunks.

use std::collections::VecDeque;

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &'static [&'static str],
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, self.separators)
    }

    fn split_with(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len(), ""));
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge(&short_pieces, separator));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge(&short_pieces, separator));
        }
        chunks
    }

    /// Greedily packs pieces into chunks, keeping a tail of up to `chunk_overlap`
    /// characters from the previous chunk at the start of the next.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join(&window, separator) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap
                    || (joined_len(&window, total) > self.chunk_size && total > 0)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    let dropped = char_len(front) + if window.is_empty() { 0 } else { separator_len };
                    total = total.saturating_sub(dropped);
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = join(&window, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn join(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
