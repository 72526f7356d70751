//! Viewport state machine — spec.md §4.E.
//!
//! Holds the currently displayed window of logical lines and issues
//! minimal console updates in response to scroll/resize/filter events.
//! `ViewportState` is pure data + arithmetic, no direct console I/O —
//! mirrors the teacher's `Screen` (wrap/scrollback bookkeeping) vs.
//! `Terminal` (crossterm rendering) split; `terminal.rs::CrosstermConsole`
//! is the only piece that executes the returned [`ConsoleOp`]s.

use std::sync::Arc;

use crate::attr::Attr;
use crate::linestore::{LineStore, PhysicalLine};
use crate::logical::{self, generate};
use crate::vtscan::MatchSource;

/// A minimal console operation. The state machine never touches a real
/// screen; `terminal.rs` interprets these.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleOp {
    MoveCursor { x: u16, y: u16 },
    FillCells { x: u16, y: u16, count: u16, ch: char, attr: Attr },
    /// Positive `rows` scrolls content up (new rows appear at the
    /// bottom); negative scrolls down (new rows appear at the top).
    ScrollRegion { rows: i32 },
    WriteText { x: u16, y: u16, text: String },
}

pub type ConsoleOps = Vec<ConsoleOp>;

/// One displayed row: a logical line plus the viewport bookkeeping
/// needed to find its neighbor without re-walking the whole store.
#[derive(Clone)]
pub struct DisplayRow {
    pub physical_line: Arc<PhysicalLine>,
    pub logical_index: usize,
    pub char_offset: usize,
    pub text: String,
    pub more_logical_lines: bool,
    pub explicit_newline_required: bool,
    /// Color in effect at the start of this row — distinct from whatever
    /// SGR state the console happens to be in when it's (re)written, so a
    /// partial repaint (e.g. after `ScrollRegion`) doesn't bleed color
    /// from an unrelated row.
    pub initial_display_color: Attr,
}

/// Events the main loop translates input/timer/resize into.
pub enum ViewportEvent {
    AddNewLinesAtBottom,
    MoveDown(usize),
    MoveUp(usize),
    MoveLeft(usize),
    MoveRight(usize),
    Regenerate { anchor: Option<Arc<PhysicalLine>> },
    Resize { width: usize, height: usize },
}

/// Next physical line in the store, honoring `use_filtered`. Shared with
/// `selection.rs` so the copy path can walk the buffer the same way the
/// viewport does without depending on a live `ViewportState`.
pub(crate) fn store_next(store: &LineStore, after: Option<&Arc<PhysicalLine>>, use_filtered: bool) -> Option<Arc<PhysicalLine>> {
    if use_filtered { store.next_filtered(after) } else { store.next(after) }
}

pub(crate) fn store_prev(store: &LineStore, before: Option<&Arc<PhysicalLine>>, use_filtered: bool) -> Option<Arc<PhysicalLine>> {
    if use_filtered { store.prev_filtered(before) } else { store.prev(before) }
}

pub(crate) fn row_at(physical: &Arc<PhysicalLine>, index: usize, width: usize, matches: &dyn MatchSource, auto_wrap: bool) -> Option<DisplayRow> {
    let mut rows = generate(physical, index, 1, width, matches, auto_wrap);
    let row = rows.pop()?;
    Some(DisplayRow {
        physical_line: row.physical_line,
        logical_index: row.logical_index,
        char_offset: row.char_offset,
        text: row.text.into_owned(),
        more_logical_lines: row.more_logical_lines,
        explicit_newline_required: row.explicit_newline_required,
        initial_display_color: row.initial_display_color,
    })
}

pub(crate) fn next_row(store: &LineStore, after: &DisplayRow, width: usize, matches: &dyn MatchSource, auto_wrap: bool, use_filtered: bool) -> Option<DisplayRow> {
    if after.more_logical_lines {
        row_at(&after.physical_line, after.logical_index + 1, width, matches, auto_wrap)
    } else {
        let next_phys = store_next(store, Some(&after.physical_line), use_filtered)?;
        row_at(&next_phys, 0, width, matches, auto_wrap)
    }
}

pub(crate) fn prev_row(store: &LineStore, before: &DisplayRow, width: usize, matches: &dyn MatchSource, auto_wrap: bool, use_filtered: bool) -> Option<DisplayRow> {
    if before.logical_index > 0 {
        row_at(&before.physical_line, before.logical_index - 1, width, matches, auto_wrap)
    } else {
        let prev_phys = store_prev(store, Some(&before.physical_line), use_filtered)?;
        let last_index = logical::count_logical_lines_on_physical_line(&prev_phys, width, matches, auto_wrap).saturating_sub(1);
        row_at(&prev_phys, last_index, width, matches, auto_wrap)
    }
}

pub struct ViewportState {
    width: usize,
    height: usize,
    display: Vec<DisplayRow>,
    /// Horizontal scroll offset in cells; does not affect `display`.
    h_offset: usize,
    lines_in_page: usize,
    total_lines_in_status: usize,
    out_of_memory: bool,
    use_filtered: bool,
}

impl ViewportState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            display: Vec::with_capacity(height),
            h_offset: 0,
            lines_in_page: 0,
            total_lines_in_status: 0,
            out_of_memory: false,
            use_filtered: false,
        }
    }

    pub fn set_filter_active(&mut self, active: bool) {
        self.use_filtered = active;
    }

    pub fn lines_in_viewport(&self) -> usize {
        self.display.len()
    }

    pub fn display(&self) -> &[DisplayRow] {
        &self.display
    }

    pub fn h_offset(&self) -> usize {
        self.h_offset
    }

    pub fn out_of_memory(&self) -> bool {
        self.out_of_memory
    }

    /// Rows the viewport is sized to show — `display().len() < height()`
    /// means the buffer hasn't produced enough lines to fill it yet
    /// (`statusline.rs`'s "Awaiting data" state).
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn use_filtered(&self) -> bool {
        self.use_filtered
    }

    fn store_next(&self, store: &LineStore, after: Option<&Arc<PhysicalLine>>) -> Option<Arc<PhysicalLine>> {
        store_next(store, after, self.use_filtered)
    }

    fn row_at(physical: &Arc<PhysicalLine>, index: usize, width: usize, matches: &dyn MatchSource, auto_wrap: bool) -> Option<DisplayRow> {
        row_at(physical, index, width, matches, auto_wrap)
    }

    fn next_row(&self, store: &LineStore, after: &DisplayRow, matches: &dyn MatchSource, auto_wrap: bool) -> Option<DisplayRow> {
        next_row(store, after, self.width, matches, auto_wrap, self.use_filtered)
    }

    fn prev_row(&self, store: &LineStore, before: &DisplayRow, matches: &dyn MatchSource, auto_wrap: bool) -> Option<DisplayRow> {
        prev_row(store, before, self.width, matches, auto_wrap, self.use_filtered)
    }

    /// Pull logical lines starting after the current bottom row, filling
    /// `display` up to `height` (spec.md §4.E: "`viewport_height −
    /// lines_in_page` logical lines"; `lines_in_page` is informational
    /// bookkeeping toward the status line's "page full" threshold here,
    /// since this viewport never blocks on a `--More--` prompt).
    pub fn add_new_lines_at_bottom(&mut self, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        let mut ops = ConsoleOps::new();
        let mut pulled = 0usize;

        if self.display.is_empty() {
            let Some(first) = self.store_next(store, None) else { return ops };
            let Some(row) = Self::row_at(&first, 0, self.width, matches, auto_wrap) else {
                self.out_of_memory = true;
                return ops;
            };
            self.push_row(row, &mut ops);
            pulled += 1;
        }

        while self.display.len() < self.height {
            let last = self.display.last().expect("just populated or non-empty").clone();
            let Some(next) = self.next_row(store, &last, matches, auto_wrap) else { break };
            self.push_row(next, &mut ops);
            pulled += 1;
        }
        self.lines_in_page += pulled;
        ops
    }

    fn push_row(&mut self, row: DisplayRow, ops: &mut ConsoleOps) {
        let y = self.display.len() as u16;
        ops.push(ConsoleOp::WriteText { x: 0, y, text: row.text.clone() });
        self.display.push(row);
    }

    /// Scroll the window down by `n` logical lines (later content moves
    /// into view at the bottom); clamps to end-of-buffer.
    pub fn move_down(&mut self, n: usize, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        let mut ops = ConsoleOps::new();
        let mut advanced = 0;
        for _ in 0..n {
            let Some(last) = self.display.last().cloned() else { break };
            let Some(next) = self.next_row(store, &last, matches, auto_wrap) else { break };
            if !self.display.is_empty() {
                self.display.remove(0);
            }
            self.display.push(next);
            advanced += 1;
        }
        if advanced > 0 {
            ops.push(ConsoleOp::ScrollRegion { rows: advanced as i32 });
            let base = self.display.len().saturating_sub(advanced);
            for (i, row) in self.display[base..].iter().enumerate() {
                ops.push(ConsoleOp::WriteText { x: 0, y: (base + i) as u16, text: row.text.clone() });
            }
        }
        ops
    }

    /// Scroll the window up by `n` logical lines (earlier content moves
    /// into view at the top).
    pub fn move_up(&mut self, n: usize, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        let mut ops = ConsoleOps::new();
        let mut prepended = 0;
        for _ in 0..n {
            let Some(first) = self.display.first().cloned() else { break };
            let Some(prev) = self.prev_row(store, &first, matches, auto_wrap) else { break };
            self.display.insert(0, prev);
            if self.display.len() > self.height {
                self.display.pop();
            }
            prepended += 1;
        }
        if prepended > 0 {
            ops.push(ConsoleOp::ScrollRegion { rows: -(prepended as i32) });
            for (i, row) in self.display.iter().take(prepended).enumerate() {
                ops.push(ConsoleOp::WriteText { x: 0, y: i as u16, text: row.text.clone() });
            }
        }
        ops
    }

    /// Shift the console window horizontally; does not change `display`.
    pub fn move_left(&mut self, n: usize) -> ConsoleOps {
        self.h_offset = self.h_offset.saturating_sub(n);
        vec![]
    }

    pub fn move_right(&mut self, n: usize) -> ConsoleOps {
        self.h_offset += n;
        vec![]
    }

    /// Clear the display array and rebuild it from logical lines
    /// generated at or before `anchor` (used on resize and filter change).
    pub fn regenerate(&mut self, anchor: Option<Arc<PhysicalLine>>, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        self.display.clear();
        self.lines_in_page = 0;
        let mut ops = vec![ConsoleOp::FillCells { x: 0, y: 0, count: (self.width * self.height) as u16, ch: ' ', attr: Attr::DEFAULT }];

        let start = anchor.or_else(|| self.store_next(store, None));
        let Some(start) = start else { return ops };
        let Some(mut row) = Self::row_at(&start, 0, self.width, matches, auto_wrap) else {
            self.out_of_memory = true;
            return ops;
        };
        loop {
            self.push_row(row.clone(), &mut ops);
            if self.display.len() >= self.height {
                break;
            }
            match self.next_row(store, &row, matches, auto_wrap) {
                Some(next) => row = next,
                None => break,
            }
        }
        ops
    }

    /// Reallocate `display` for a new size. If the width is unchanged,
    /// preserve existing logical lines (extend or truncate); otherwise
    /// capture the top-visible physical line as anchor and regenerate.
    pub fn resize(&mut self, new_width: usize, new_height: usize, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        if new_width == self.width {
            self.height = new_height;
            if self.display.len() > new_height {
                self.display.truncate(new_height);
                vec![]
            } else {
                self.add_new_lines_at_bottom(store, matches, auto_wrap)
            }
        } else {
            let anchor = self.display.first().map(|r| r.physical_line.clone());
            self.width = new_width;
            self.height = new_height;
            self.regenerate(anchor, store, matches, auto_wrap)
        }
    }

    pub fn reset_page(&mut self) {
        self.lines_in_page = 0;
    }

    pub fn total_lines_in_status(&self) -> usize {
        self.total_lines_in_status
    }

    pub fn set_total_lines_in_status(&mut self, n: usize) {
        self.total_lines_in_status = n;
    }

    /// Single entry point matching spec.md §4.E's
    /// `dispatch(event) -> ConsoleOps`.
    pub fn dispatch(&mut self, event: ViewportEvent, store: &LineStore, matches: &dyn MatchSource, auto_wrap: bool) -> ConsoleOps {
        match event {
            ViewportEvent::AddNewLinesAtBottom => self.add_new_lines_at_bottom(store, matches, auto_wrap),
            ViewportEvent::MoveDown(n) => self.move_down(n, store, matches, auto_wrap),
            ViewportEvent::MoveUp(n) => self.move_up(n, store, matches, auto_wrap),
            ViewportEvent::MoveLeft(n) => self.move_left(n),
            ViewportEvent::MoveRight(n) => self.move_right(n),
            ViewportEvent::Regenerate { anchor } => self.regenerate(anchor, store, matches, auto_wrap),
            ViewportEvent::Resize { width, height } => self.resize(width, height, store, matches, auto_wrap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SharedLine;
    use crate::vtscan::NoMatches;

    fn fill_store(n: usize) -> LineStore {
        let store = LineStore::new();
        for i in 0..n {
            let mem: Arc<str> = Arc::from(format!("line {i}"));
            store.append(SharedLine::whole(mem), Attr::DEFAULT);
        }
        store
    }

    #[test]
    fn add_new_lines_fills_viewport_up_to_height() {
        let store = fill_store(10);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        assert_eq!(vp.lines_in_viewport(), 5);
        assert_eq!(vp.display()[0].text, "line 0");
        assert_eq!(vp.display()[4].text, "line 4");
    }

    #[test]
    fn add_new_lines_stops_at_end_of_buffer() {
        let store = fill_store(3);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        assert_eq!(vp.lines_in_viewport(), 3);
    }

    #[test]
    fn invariant_lines_in_viewport_never_exceeds_height() {
        let store = fill_store(100);
        let mut vp = ViewportState::new(80, 10);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        vp.move_down(50, &store, &NoMatches, true);
        assert!(vp.lines_in_viewport() <= 10);
    }

    #[test]
    fn invariant_6_scroll_monotonicity_round_trip() {
        let store = fill_store(50);
        let mut vp = ViewportState::new(80, 10);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        vp.move_down(5, &store, &NoMatches, true);
        let before: Vec<String> = vp.display().iter().map(|r| r.text.clone()).collect();
        vp.move_down(3, &store, &NoMatches, true);
        vp.move_up(3, &store, &NoMatches, true);
        let after: Vec<String> = vp.display().iter().map(|r| r.text.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn move_down_then_up_one_step_restores_top() {
        let store = fill_store(20);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let top_before = vp.display()[0].text.clone();
        vp.move_down(1, &store, &NoMatches, true);
        vp.move_up(1, &store, &NoMatches, true);
        assert_eq!(vp.display()[0].text, top_before);
    }

    #[test]
    fn regenerate_clears_and_rebuilds_from_anchor() {
        let store = fill_store(20);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        vp.move_down(10, &store, &NoMatches, true);
        let anchor = vp.display()[0].physical_line.clone();
        vp.regenerate(Some(anchor.clone()), &store, &NoMatches, true);
        assert!(Arc::ptr_eq(&vp.display()[0].physical_line, &anchor));
    }

    #[test]
    fn resize_same_width_truncates_without_regenerating() {
        let store = fill_store(20);
        let mut vp = ViewportState::new(80, 10);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let top_before = vp.display()[0].text.clone();
        vp.resize(80, 5, &store, &NoMatches, true);
        assert_eq!(vp.lines_in_viewport(), 5);
        assert_eq!(vp.display()[0].text, top_before);
    }

    #[test]
    fn move_left_right_adjust_h_offset_not_display() {
        let store = fill_store(5);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let before_len = vp.lines_in_viewport();
        vp.move_right(10);
        assert_eq!(vp.h_offset(), 10);
        vp.move_left(4);
        assert_eq!(vp.h_offset(), 6);
        assert_eq!(vp.lines_in_viewport(), before_len);
    }
}
