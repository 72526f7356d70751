//! Search / filter engine — spec.md §4.D.
//!
//! Up to 10 colored patterns, matched simultaneously and case-insensitively
//! with `aho_corasick::AhoCorasick`, re-grounded on the teacher's own
//! `pattern.rs` comment that flags Aho-Corasick as the right structure for
//! many simultaneous patterns (single-pattern triggers there use a plain
//! substring scan instead). Regex is excluded per spec.md §1 Non-goals.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

use crate::attr::Attr;
use crate::vtscan::MatchSource;

/// Maximum number of simultaneously active search patterns.
pub const MAX_PATTERNS: usize = 10;

struct Slot {
    pattern: String,
    color: Attr,
}

/// A compact array of up to [`MAX_PATTERNS`] `{pattern, color}` entries.
/// Active entries occupy a contiguous prefix; `free` compacts the rest
/// down to preserve that.
pub struct PatternTable {
    slots: Vec<Slot>,
    compiled: Option<AhoCorasick>,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTable {
    pub fn new() -> Self {
        Self { slots: Vec::with_capacity(MAX_PATTERNS), compiled: None }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn color_at(&self, slot: usize) -> Option<Attr> {
        self.slots.get(slot).map(|s| s.color)
    }

    pub fn pattern_at(&self, slot: usize) -> Option<&str> {
        self.slots.get(slot).map(|s| s.pattern.as_str())
    }

    /// Insert or replace the pattern for `color`, returning its slot
    /// index. Returns `None` if the table is full and `color` isn't
    /// already present.
    pub fn index_for_color(&mut self, color: Attr, pattern: &str) -> Option<usize> {
        if let Some(idx) = self.slots.iter().position(|s| s.color == color) {
            self.slots[idx].pattern = pattern.to_owned();
            self.rebuild();
            return Some(idx);
        }
        if self.slots.len() >= MAX_PATTERNS {
            return None;
        }
        self.slots.push(Slot { pattern: pattern.to_owned(), color });
        self.rebuild();
        Some(self.slots.len() - 1)
    }

    /// Remove the entry at `slot`, compacting trailing entries down so
    /// active entries remain a contiguous prefix.
    pub fn free(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.slots.remove(slot);
            self.rebuild();
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.compiled = None;
    }

    fn rebuild(&mut self) {
        if self.slots.is_empty() {
            self.compiled = None;
            return;
        }
        self.compiled = Some(
            AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build(self.slots.iter().map(|s| s.pattern.as_str())),
        );
    }

    /// Case-insensitive first occurrence of any active pattern in `text`,
    /// starting the search at or after byte offset `from`. Ties are
    /// broken by leftmost offset, then by lowest slot index.
    pub fn find_next_match(&self, text: &str, from: usize) -> Option<(usize, usize, usize)> {
        let ac = self.compiled.as_ref()?;
        if from > text.len() {
            return None;
        }
        let mut best: Option<(usize, usize, usize)> = None;
        for m in ac.find_iter(&text[from..]) {
            let start = from + m.start();
            let end = from + m.end();
            let slot = m.pattern();
            let candidate = (start, end, slot);
            best = Some(match best {
                None => candidate,
                Some(b) if (start, slot) < (b.0, b.2) => candidate,
                Some(b) => b,
            });
        }
        best
    }

    /// Whether `text` matches any active pattern (the filter predicate).
    pub fn matches(&self, text: &str) -> bool {
        self.compiled.as_ref().is_some_and(|ac| ac.is_match(text))
    }
}

impl MatchSource for PatternTable {
    fn next_match(&self, text: &str, from: usize) -> Option<(usize, usize, Attr)> {
        self.find_next_match(text, from).map(|(s, e, slot)| (s, e, self.slots[slot].color))
    }
}
