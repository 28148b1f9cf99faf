//! Rotating window over a symbol list.
//!
//! Each cycle fetches the contiguous slice `[cursor, cursor + size)` (clipped to
//! the end of the list). The cursor only moves on a successful cycle and wraps to
//! zero once it reaches the end, so a failed cycle retries the same slice.

/// Cursor state for windowed polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingWindow {
    size: Option<usize>,
    cursor: usize,
}

impl PollingWindow {
    /// `None` or `Some(0)` disables windowing.
    pub fn new(size: Option<usize>) -> Self {
        Self {
            size: size.filter(|s| *s > 0),
            cursor: 0,
        }
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Configured window size.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Go back to the start of the list.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    fn effective_size(&self, len: usize) -> Option<usize> {
        self.size.filter(|s| *s < len)
    }

    /// Symbols to fetch this cycle.
    pub fn slice(&self, symbols: &[String]) -> Vec<String> {
        match self.effective_size(symbols.len()) {
            None => symbols.to_vec(),
            Some(size) => {
                let start = self.cursor.min(symbols.len());
                let end = (start + size).min(symbols.len());
                symbols[start..end].to_vec()
            }
        }
    }

    /// Move past the slice that was just fetched successfully.
    pub fn advance(&mut self, len: usize) {
        let Some(size) = self.effective_size(len) else {
            self.cursor = 0;
            return;
        };
        self.cursor += size;
        if self.cursor >= len {
            self.cursor = 0;
        }
    }
}
