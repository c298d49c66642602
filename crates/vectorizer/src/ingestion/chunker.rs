//! Recursive character text splitting with overlap

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};

/// Default separators, coarsest first; the empty separator splits into graphemes
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits text into bounded, overlapping pieces
pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Recursive character splitter.
///
/// Tries each separator in turn: pieces still longer than `chunk_size` are
/// split again with the next finer separator, and adjacent small pieces are
/// merged back into chunks of at most `chunk_size` characters, carrying up to
/// `chunk_overlap` characters of trailing context into the next chunk.
/// Separators stay attached to the start of the piece that follows them.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::validation("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        // Pick the first separator present in the text
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Merge small pieces into chunks of at most `chunk_size` characters
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of {} characters, longer than the limit of {}",
                        total,
                        self.chunk_size
                    );
                }
                if let Some(chunk) = join_window(&window) {
                    merged.push(chunk);
                }

                // Keep only as much trailing context as the overlap allows
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            merged.push(chunk);
        }

        merged
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split on `separator`, attaching each separator to the piece after it
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.graphemes(true).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}
