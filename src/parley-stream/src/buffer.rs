//! Pending text for the active stream.
//!
//! Fragments are kept in arrival order. Concatenated, they always equal the
//! text that has arrived but has not been revealed yet.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    chars: usize,
}

/// Append-only FIFO of not-yet-revealed text.
///
/// Lengths are counted in Unicode scalar values, so a reveal never splits
/// a multi-byte character.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer {
    fragments: VecDeque<Fragment>,
    chars: usize,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment. Empty fragments are dropped.
    pub fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let chars = text.chars().count();
        self.chars += chars;
        self.fragments.push_back(Fragment {
            text: text.to_owned(),
            chars,
        });
    }

    /// Removes and returns at most `max` characters from the front.
    pub fn take_chars(&mut self, max: usize) -> String {
        let mut out = String::new();
        let mut remaining = max;

        while remaining > 0 {
            let Some(front) = self.fragments.front_mut() else {
                break;
            };

            if front.chars <= remaining {
                remaining -= front.chars;
                self.chars -= front.chars;
                out.push_str(&front.text);
                self.fragments.pop_front();
                continue;
            }

            let split = front
                .text
                .char_indices()
                .nth(remaining)
                .map(|(idx, _)| idx)
                .unwrap_or(front.text.len());
            out.extend(front.text.drain(..split));
            front.chars -= remaining;
            self.chars -= remaining;
            remaining = 0;
        }

        out
    }

    /// Removes and returns everything.
    pub fn drain_all(&mut self) -> String {
        let mut out = String::with_capacity(self.byte_len());
        for fragment in self.fragments.drain(..) {
            out.push_str(&fragment.text);
        }
        self.chars = 0;
        out
    }

    /// Appends the buffered text to `out` without consuming it.
    pub fn write_into(&self, out: &mut String) {
        for fragment in &self.fragments {
            out.push_str(&fragment.text);
        }
    }

    /// Returns the buffered text as one string.
    pub fn contents(&self) -> String {
        let mut out = String::with_capacity(self.byte_len());
        self.write_into(&mut out);
        out
    }

    /// Number of buffered characters.
    #[inline]
    pub fn char_len(&self) -> usize {
        self.chars
    }

    fn byte_len(&self) -> usize {
        self.fragments.iter().map(|f| f.text.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Number of fragments still queued.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.chars = 0;
    }
}
