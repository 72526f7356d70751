//! Rectangular selection & clipboard export — spec.md §4.F.
//!
//! Selection corners are anchored to buffer-line identity (a physical
//! line plus its wrap index), not a raw screen row, so that scrolling the
//! viewport mid-drag doesn't invalidate the selection — spec.md: "anchoring
//! to buffer-line identity so that scrolling preserves the selection's
//! logical target". The copy path re-derives logical lines by walking the
//! store exactly as the viewport does (`crate::viewport`'s row-walking
//! helpers), clips each to the selected cell range with
//! [`crate::vtscan::clip_to_cell_range`], and assembles VT/plain/HTML
//! forms. [`vt_to_html`] walks the VT form once, generalizing the
//! teacher's `terminal.rs` `Attr` → `ContentStyle` mapping (`attr_style`)
//! to an inline `<span>`.

use std::sync::Arc;

use crate::attr::{ansi_color_name, final_color_from_escape, string_to_text_attribute, Attr};
use crate::linestore::{LineStore, PhysicalLine};
use crate::vtscan::{clip_to_cell_range, parse_csi, MatchSource};
use crate::viewport::{self, ViewportState};

/// One corner of a selection: which physical line, which of its wrapped
/// logical lines, and which cell column within that logical line.
#[derive(Clone)]
pub struct BufferAnchor {
    pub physical_line: Arc<PhysicalLine>,
    pub logical_index: usize,
    pub col: usize,
}

fn order_key(a: &BufferAnchor) -> (u64, usize) {
    (a.physical_line.line_number(), a.logical_index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Committed,
}

/// Direction to auto-scroll while the drag pointer sits outside the
/// client rectangle: positive rows moves the viewport down, negative up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollVector {
    pub rows: i32,
}

/// The three representations produced by a copy (spec.md §4.F).
pub struct ClipboardExport {
    pub plain: String,
    pub vt: String,
    pub html: String,
}

pub struct Selection {
    phase: Phase,
    anchor: Option<BufferAnchor>,
    far: Option<BufferAnchor>,
    scroll_vector: Option<ScrollVector>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    pub fn new() -> Self {
        Self { phase: Phase::Idle, anchor: None, far: None, scroll_vector: None }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn scroll_vector(&self) -> Option<ScrollVector> {
        self.scroll_vector
    }

    /// Begin a drag at the viewport-relative row/col the mouse went down on.
    pub fn press_at(&mut self, row: usize, col: usize, viewport: &ViewportState) {
        let Some(r) = viewport.display().get(row) else { return };
        let a = BufferAnchor { physical_line: r.physical_line.clone(), logical_index: r.logical_index, col };
        self.anchor = Some(a.clone());
        self.far = Some(a);
        self.scroll_vector = None;
        self.phase = Phase::Dragging;
    }

    /// Update the far corner on mouse-move. `row` may fall outside
    /// `[0, viewport height)`, meaning the pointer has left the client
    /// rectangle — that arms the periodic-scroll vector instead of moving
    /// the far corner (spec.md §4.F).
    pub fn drag_to(&mut self, row: i32, col: usize, viewport: &ViewportState) {
        if self.phase != Phase::Dragging {
            return;
        }
        let height = viewport.lines_in_viewport() as i32;
        if row < 0 {
            self.scroll_vector = Some(ScrollVector { rows: -1 });
            return;
        }
        if row >= height {
            self.scroll_vector = Some(ScrollVector { rows: 1 });
            return;
        }
        self.scroll_vector = None;
        if let Some(r) = viewport.display().get(row as usize) {
            self.far = Some(BufferAnchor { physical_line: r.physical_line.clone(), logical_index: r.logical_index, col });
        }
    }

    /// One periodic-scroll tick while dragging outside the client
    /// rectangle: the far corner follows the buffer in the scroll
    /// direction, translating the selection's buffer-anchored coordinates
    /// along with the viewport (spec.md §4.F).
    pub fn tick_scroll(&mut self, store: &LineStore, width: usize, matches: &dyn MatchSource, auto_wrap: bool, use_filtered: bool) {
        let Some(vector) = self.scroll_vector else { return };
        let Some(far) = self.far.clone() else { return };
        let stepped = if vector.rows > 0 {
            viewport::store_next(store, Some(&far.physical_line), use_filtered)
                .and_then(|phys| viewport::row_at(&phys, 0, width, matches, auto_wrap))
        } else {
            viewport::store_prev(store, Some(&far.physical_line), use_filtered)
                .and_then(|phys| viewport::row_at(&phys, 0, width, matches, auto_wrap))
        };
        if let Some(row) = stepped {
            self.far = Some(BufferAnchor { physical_line: row.physical_line, logical_index: row.logical_index, col: far.col });
        }
    }

    pub fn release(&mut self) {
        if self.phase == Phase::Dragging {
            self.phase = Phase::Committed;
            self.scroll_vector = None;
        }
    }

    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.anchor = None;
        self.far = None;
        self.scroll_vector = None;
    }

    /// Double-click word-expand at `(row, col)`: selects the run of
    /// non-break characters under the cursor and commits immediately, no
    /// drag involved. Forms no selection if the cursor sits on a break
    /// character (spec.md §4.F).
    pub fn double_click(&mut self, row: usize, col: usize, break_chars: &str, viewport: &ViewportState) {
        let Some(r) = viewport.display().get(row) else { return };
        let cells = visible_cells(&r.text);
        let Some(&(_, ch)) = cells.get(col) else { return };
        if break_chars.contains(ch) {
            return;
        }
        let mut left = col;
        while left > 0 && !break_chars.contains(cells[left - 1].1) {
            left -= 1;
        }
        let mut right = col;
        while right + 1 < cells.len() && !break_chars.contains(cells[right + 1].1) {
            right += 1;
        }
        self.anchor = Some(BufferAnchor { physical_line: r.physical_line.clone(), logical_index: r.logical_index, col: left });
        self.far = Some(BufferAnchor { physical_line: r.physical_line.clone(), logical_index: r.logical_index, col: right + 1 });
        self.scroll_vector = None;
        self.phase = Phase::Committed;
    }

    /// Re-derive the logical lines under the selection and assemble
    /// VT/plain/HTML clipboard representations (spec.md §4.F copy path).
    /// `None` if nothing is selected.
    pub fn copy(&self, store: &LineStore, width: usize, matches: &dyn MatchSource, auto_wrap: bool, use_filtered: bool) -> Option<ClipboardExport> {
        let anchor = self.anchor.as_ref()?;
        let far = self.far.as_ref()?;
        let (top, bottom) = if order_key(anchor) <= order_key(far) { (anchor, far) } else { (far, anchor) };
        let left = anchor.col.min(far.col);
        let right = anchor.col.max(far.col);

        let mut rows = Vec::new();
        let mut row = viewport::row_at(&top.physical_line, top.logical_index, width, matches, auto_wrap)?;
        loop {
            let reached_bottom = Arc::ptr_eq(&row.physical_line, &bottom.physical_line) && row.logical_index == bottom.logical_index;
            let is_last = reached_bottom || !row.more_logical_lines && viewport::store_next(store, Some(&row.physical_line), use_filtered).is_none();
            rows.push(row.clone());
            if reached_bottom || is_last {
                break;
            }
            match viewport::next_row(store, &row, width, matches, auto_wrap, use_filtered) {
                Some(next) => row = next,
                // Bottom anchor no longer reachable (e.g. filtered out mid-drag); stop with what we have.
                None => break,
            }
        }

        let mut vt = String::new();
        for r in &rows {
            let (clipped, color) = clip_to_cell_range(&r.text, left, right, r.initial_display_color);
            vt.push_str(&string_to_text_attribute(color));
            vt.push_str(clipped);
            vt.push_str("\r\n");
        }

        let mut plain = strip_escapes(&vt);
        while plain.ends_with('\n') || plain.ends_with('\r') {
            plain.pop();
        }
        let html = vt_to_html(&vt);

        Some(ClipboardExport { plain, vt, html })
    }
}

/// Cell-indexed visible characters of a logical line's text, with
/// embedded CSI escapes skipped (reuses [`parse_csi`] the same way
/// `vtscan::logical_line_length` does).
fn visible_cells(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        if text.as_bytes()[pos] == 0x1b {
            if let Some(len) = parse_csi(&text[pos..]) {
                pos += len;
                continue;
            }
        }
        let ch = text[pos..].chars().next().expect("pos < text.len()");
        out.push((pos, ch));
        pos += ch.len_utf8();
    }
    out
}

/// Strip embedded CSI escapes, leaving only the printable characters.
fn strip_escapes(text: &str) -> String {
    visible_cells(text).into_iter().map(|(_, ch)| ch).collect()
}

/// Convert the VT form to HTML in a single walk, opening/closing a
/// `<span style="...">` whenever the color changes — the same mapping
/// `terminal.rs` uses to turn `Attr` into a crossterm `ContentStyle`
/// (`attr::ansi_color_name`'s 16-entry palette), just targeting inline CSS.
fn vt_to_html(vt: &str) -> String {
    let mut html = String::from("<pre>");
    let mut color = Attr::DEFAULT;
    let mut span_open = false;
    let mut pos = 0;
    while pos < vt.len() {
        if vt.as_bytes()[pos] == 0x1b {
            if let Some(len) = parse_csi(&vt[pos..]) {
                let new_color = final_color_from_escape(color, &vt[pos..pos + len]);
                if new_color != color && span_open {
                    html.push_str("</span>");
                    span_open = false;
                }
                color = new_color;
                pos += len;
                continue;
            }
        }
        if vt[pos..].starts_with("\r\n") {
            if span_open {
                html.push_str("</span>");
                span_open = false;
            }
            html.push_str("<br>\n");
            pos += 2;
            continue;
        }
        if !span_open && color != Attr::DEFAULT {
            let (fg, bg) = color.effective_fg_bg();
            html.push_str(&format!("<span style=\"color:{};background-color:{}\">", ansi_color_name(fg), ansi_color_name(bg)));
            span_open = true;
        }
        let ch = vt[pos..].chars().next().expect("pos < vt.len()");
        match ch {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            _ => html.push(ch),
        }
        pos += ch.len_utf8();
    }
    if span_open {
        html.push_str("</span>");
    }
    html.push_str("</pre>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::color::*;
    use crate::buffer::SharedLine;
    use crate::linestore::LineStore;
    use crate::vtscan::NoMatches;

    fn fill_store(lines: &[&str]) -> LineStore {
        let store = LineStore::new();
        for text in lines {
            let mem: Arc<str> = Arc::from(*text);
            store.append(SharedLine::whole(mem), Attr::DEFAULT);
        }
        store
    }

    #[test]
    fn press_then_release_commits_selection() {
        let store = fill_store(&["abcdef", "ghijkl"]);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 1, &vp);
        assert_eq!(sel.phase(), Phase::Dragging);
        sel.drag_to(1, 3, &vp);
        sel.release();
        assert_eq!(sel.phase(), Phase::Committed);
    }

    #[test]
    fn drag_outside_client_rect_arms_scroll_vector() {
        let store = fill_store(&["a", "b", "c"]);
        let mut vp = ViewportState::new(80, 2);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 0, &vp);
        sel.drag_to(5, 0, &vp);
        assert_eq!(sel.scroll_vector(), Some(ScrollVector { rows: 1 }));
        sel.drag_to(-1, 0, &vp);
        assert_eq!(sel.scroll_vector(), Some(ScrollVector { rows: -1 }));
    }

    #[test]
    fn double_click_expands_to_word() {
        let store = fill_store(&["foo bar baz"]);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.double_click(0, 5, " ", &vp); // 'a' in "bar"
        assert_eq!(sel.phase(), Phase::Committed);
        let out = sel.copy(&store, 80, &NoMatches, true, false).unwrap();
        assert_eq!(out.plain, "bar");
    }

    #[test]
    fn double_click_on_break_char_forms_no_selection() {
        let store = fill_store(&["foo bar"]);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.double_click(0, 3, " ", &vp); // the space itself
        assert_eq!(sel.phase(), Phase::Idle);
        assert!(sel.copy(&store, 80, &NoMatches, true, false).is_none());
    }

    // ── S6 ────────────────────────────────────────────────────────────────

    #[test]
    fn s6_selection_clips_three_lines_to_column_range() {
        let store = fill_store(&["AAAAAAAAAA", "BBBBBBBBBB", "CCCCCCCCCC"]);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 2, &vp); // (col 2, row 0)
        sel.drag_to(2, 5, &vp); // (col 5, row 2)
        sel.release();
        let out = sel.copy(&store, 80, &NoMatches, true, false).unwrap();
        assert_eq!(out.plain, "AAA\r\nBBB\r\nCCC");
    }

    #[test]
    fn vt_form_carries_initial_color_per_line() {
        let store = LineStore::new();
        let mem: Arc<str> = Arc::from("hello");
        store.append(SharedLine::whole(mem), Attr::from_fg_bg(RED, 0));
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 0, &vp);
        sel.drag_to(0, 4, &vp);
        sel.release();
        let out = sel.copy(&store, 80, &NoMatches, true, false).unwrap();
        assert!(out.vt.contains(&string_to_text_attribute(Attr::from_fg_bg(RED, 0))));
        assert_eq!(out.plain, "hell");
    }

    #[test]
    fn html_form_wraps_colored_text_in_span() {
        let store = LineStore::new();
        let mem: Arc<str> = Arc::from("hi");
        store.append(SharedLine::whole(mem), Attr::from_fg_bg(GREEN, 0));
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 0, &vp);
        sel.drag_to(0, 1, &vp);
        sel.release();
        let out = sel.copy(&store, 80, &NoMatches, true, false).unwrap();
        assert!(out.html.contains("<span"));
        assert!(out.html.contains("green"));
    }

    #[test]
    fn clear_resets_to_idle() {
        let store = fill_store(&["abc"]);
        let mut vp = ViewportState::new(80, 5);
        vp.add_new_lines_at_bottom(&store, &NoMatches, true);
        let mut sel = Selection::new();
        sel.press_at(0, 0, &vp);
        sel.clear();
        assert_eq!(sel.phase(), Phase::Idle);
        assert!(sel.copy(&store, 80, &NoMatches, true, false).is_none());
    }
}
