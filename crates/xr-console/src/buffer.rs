//! Stream buffer for unframed console output.
//!
//! The console transport delivers text in arbitrary-sized chunks with no
//! message boundaries: prompts arrive split across reads, interleaved
//! with empty-line noise, and sometimes repeated. [`StreamBuffer`]
//! accumulates decoded chunks and recovers the last *meaningful* line,
//! which is what the prompt classifier operates on.
//!
//! History is bounded: past `max_chunks` the oldest chunk is evicted, so
//! a long-lived session cannot grow without limit while the last-line
//! contract still holds (the trailing line always lives in the newest
//! chunks).

use std::collections::VecDeque;

/// Accumulates decoded console output and exposes the trailing
/// non-empty line.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    chunks: VecDeque<String>,
    max_chunks: usize,
}

impl StreamBuffer {
    /// Create a buffer retaining at most `max_chunks` decoded chunks.
    ///
    /// A bound of zero is treated as one: a buffer that cannot hold the
    /// chunk just read would break the last-line contract.
    #[must_use]
    pub fn new(max_chunks: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            max_chunks: max_chunks.max(1),
        }
    }

    /// Decode a raw read and append it to history.
    ///
    /// Invalid byte sequences decode lossily; the resulting replacement
    /// characters simply fail to classify downstream. Empty reads are
    /// not recorded.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.append_text(String::from_utf8_lossy(bytes).into_owned());
    }

    /// Append already-decoded text to history.
    pub fn append_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if self.chunks.len() == self.max_chunks {
            self.chunks.pop_front();
        }
        self.chunks.push_back(text);
    }

    /// The last non-empty trimmed line across retained history.
    ///
    /// Scans backward through chunks and their lines; returns `None`
    /// when history holds no signal yet, which callers must treat as
    /// "no prompt", never as a stale prompt.
    #[must_use]
    pub fn last_line(&self) -> Option<&str> {
        for chunk in self.chunks.iter().rev() {
            for line in chunk.lines().rev() {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed);
                }
            }
        }
        None
    }

    /// Concatenation of all retained history, for diagnostics.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.chunks.iter().map(String::as_str).collect()
    }

    /// Number of retained chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if no output has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop all retained history.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
