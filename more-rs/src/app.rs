//! Top-level wiring — spec.md §4.E's main loop: `Idle → (input|data|timer)
//! → Dispatch → Idle`, grounded on the teacher's `EventLoop::run`
//! (`tokio::select!` over stdin/net/signals/timer, dispatching into the
//! owned state). Key bindings per spec.md §6.
//!
//! `ingest_thread_handle` observability (spec.md §4.G) is implemented as a
//! polled `IngestHarness::ingest_finished` flag rather than a fourth
//! `select!` branch: re-polling an owned `JoinHandle` as a `select!` arm
//! across loop iterations isn't supported once it resolves, so termination
//! is instead noticed on the next input/data/timer wake, bounded by the
//! same 250 ms the spec already allows the timer branch.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, MouseButton};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::attr::{color, Attr};
use crate::clipboard::ClipboardSink;
use crate::concurrency::IngestHarness;
use crate::input::InputEvent;
use crate::linestore::LineStore;
use crate::search::PatternTable;
use crate::selection::Selection;
use crate::statusline;
use crate::terminal::ConsoleSink;
use crate::viewport::{ConsoleOps, ViewportEvent, ViewportState};

const TICK: Duration = Duration::from_millis(250);

/// Characters that end a word for double-click expansion (spec.md §4.F).
const WORD_BREAK_CHARS: &str = " \t\"'(){}[]<>,;:.";

/// Logical lines scrolled per wheel notch — spec.md §9 AMBIENT's Open
/// Question resolution: the wheel scrolls the buffer, three lines per
/// notch.
const WHEEL_LINES: usize = 3;

/// Base palette colors selectable by `Ctrl+1`..`Ctrl+8` (spec.md §6:
/// "Ctrl+1…Ctrl+N: select active search color index"). `N` is the base
/// 8-color palette, not [`crate::search::MAX_PATTERNS`] (10) — the 9th and
/// 10th slots are reachable only by reusing a color already assigned.
const SEARCH_COLOR_KEYS: [char; 8] = ['1', '2', '3', '4', '5', '6', '7', '8'];

fn search_color_for_digit(c: char) -> Option<Attr> {
    let idx = SEARCH_COLOR_KEYS.iter().position(|&k| k == c)? as u8;
    Some(Attr::from_fg_bg(idx, color::BLACK))
}

pub struct App<C: ConsoleSink, K: ClipboardSink> {
    console: C,
    clipboard: K,
    store: Arc<LineStore>,
    harness: IngestHarness,
    input_rx: mpsc::Receiver<InputEvent>,
    viewport: ViewportState,
    patterns: PatternTable,
    selection: Selection,
    filter_active: bool,
    debug_display: bool,
    /// Active search-pattern color being edited by typing, if any
    /// (spec.md §6: "Typing while search UI is active"). `Ctrl+<digit>`
    /// both selects the slot and enters/continues this editing mode;
    /// `Esc` exits it without discarding the compiled pattern.
    editing: Option<Attr>,
    quit: bool,
    status_row: u16,
}

impl<C: ConsoleSink, K: ClipboardSink> App<C, K> {
    pub fn new(console: C, clipboard: K, store: Arc<LineStore>, harness: IngestHarness, input_rx: mpsc::Receiver<InputEvent>, debug_display: bool) -> Self {
        let (width, height) = console.get_size();
        let status_row = height.saturating_sub(1);
        let viewport = ViewportState::new(width as usize, status_row as usize);
        Self {
            console,
            clipboard,
            store,
            harness,
            input_rx,
            viewport,
            patterns: PatternTable::new(),
            selection: Selection::new(),
            filter_active: false,
            debug_display,
            editing: None,
            quit: false,
            status_row,
        }
    }

    fn auto_wrap(&self) -> bool {
        self.console.auto_wrap()
    }

    fn viewport_width(&self) -> usize {
        self.console.get_size().0 as usize
    }

    fn height(&self) -> usize {
        self.status_row as usize
    }

    fn total(&self) -> usize {
        if self.filter_active { self.store.filtered_count() } else { self.store.total_count() }
    }

    fn top_anchor(&self) -> Option<Arc<crate::linestore::PhysicalLine>> {
        self.viewport.display().first().map(|r| r.physical_line.clone())
    }

    /// Run until `q`/`Q` is pressed or the ingester terminates having
    /// produced no lines at all (spec.md §5 cancellation semantics).
    pub async fn run(&mut self) -> std::io::Result<()> {
        let auto_wrap = self.auto_wrap();
        let store = self.store.clone();
        let mut ops = self.viewport.add_new_lines_at_bottom(&store, &self.patterns, auto_wrap);
        self.console.apply(&ops)?;
        self.refresh_status()?;

        if self.harness.ingest_finished() && self.store.total_count() == 0 {
            return Ok(());
        }

        let mut ticker = interval(TICK);
        while !self.quit {
            tokio::select! {
                Some(event) = self.input_rx.recv() => {
                    ops = self.handle_input(event);
                }
                _ = self.store.wait_for_data() => {
                    let auto_wrap = self.auto_wrap();
                    let store = self.store.clone();
                    ops = self.viewport.add_new_lines_at_bottom(&store, &self.patterns, auto_wrap);
                }
                _ = ticker.tick() => {
                    ops = self.tick();
                }
            }

            if self.debug_display {
                let auto_wrap = self.auto_wrap();
                let anchor = self.top_anchor();
                let store = self.store.clone();
                ops = self.viewport.regenerate(anchor, &store, &self.patterns, auto_wrap);
            }
            self.console.apply(&ops)?;
            self.refresh_status()?;

            if self.harness.ingest_finished() && self.store.total_count() == 0 {
                break;
            }
        }

        self.harness.shutdown.set();
        Ok(())
    }

    fn refresh_status(&mut self) -> std::io::Result<()> {
        let status = statusline::render(self.total(), self.filter_active, &self.viewport, self.store.ingest_done());
        self.console.render_status(self.status_row, &status)
    }

    /// Advance selection auto-scroll on the 250ms timer tick (spec.md
    /// §4.E/§4.F); the status line is refreshed separately every wake.
    fn tick(&mut self) -> ConsoleOps {
        if self.selection.scroll_vector().is_some() {
            let width = self.viewport_width();
            let auto_wrap = self.auto_wrap();
            let filter_active = self.filter_active;
            let store = self.store.clone();
            self.selection.tick_scroll(&store, width, &self.patterns, auto_wrap, filter_active);
        }
        ConsoleOps::new()
    }

    fn dispatch(&mut self, event: ViewportEvent) -> ConsoleOps {
        let auto_wrap = self.auto_wrap();
        let store = self.store.clone();
        self.viewport.dispatch(event, &store, &self.patterns, auto_wrap)
    }

    fn handle_input(&mut self, event: InputEvent) -> ConsoleOps {
        match event {
            InputEvent::KeyDown { code, ctrl } => self.handle_key(code, ctrl),
            InputEvent::MouseDown { x, y, button: MouseButton::Left } => {
                self.selection.press_at(y as usize, x as usize, &self.viewport);
                ConsoleOps::new()
            }
            InputEvent::MouseDoubleClick { x, y, button: MouseButton::Left } => {
                self.selection.double_click(y as usize, x as usize, WORD_BREAK_CHARS, &self.viewport);
                ConsoleOps::new()
            }
            InputEvent::MouseMove { x, y } => {
                if self.selection.is_active() {
                    self.selection.drag_to(y as i32, x as usize, &self.viewport);
                }
                ConsoleOps::new()
            }
            InputEvent::MouseUp { .. } => {
                self.selection.release();
                ConsoleOps::new()
            }
            InputEvent::MouseWheel { delta, .. } => {
                if delta > 0 {
                    self.dispatch(ViewportEvent::MoveUp(WHEEL_LINES))
                } else {
                    self.dispatch(ViewportEvent::MoveDown(WHEEL_LINES))
                }
            }
            InputEvent::WindowResize { width, height } => {
                self.status_row = height.saturating_sub(1);
                self.console.handle_resize(width, height);
                self.dispatch(ViewportEvent::Resize { width: width as usize, height: self.status_row as usize })
            }
            _ => ConsoleOps::new(),
        }
    }

    fn handle_key(&mut self, code: KeyCode, ctrl: bool) -> ConsoleOps {
        if ctrl {
            if let KeyCode::Char(c) = code {
                if let Some(color) = search_color_for_digit(c) {
                    self.editing = Some(color);
                    return ConsoleOps::new();
                }
            }
        }

        if let Some(active) = self.editing {
            match code {
                KeyCode::Esc => {
                    self.editing = None;
                    return ConsoleOps::new();
                }
                KeyCode::Backspace => {
                    let slot = self.slot_for(active);
                    let current = self.patterns.pattern_at(slot).unwrap_or("").to_owned();
                    let mut chars: Vec<char> = current.chars().collect();
                    chars.pop();
                    return self.update_pattern(active, chars.into_iter().collect());
                }
                KeyCode::Char(c) => {
                    let slot = self.slot_for(active);
                    let current = self.patterns.pattern_at(slot).unwrap_or("").to_owned();
                    return self.update_pattern(active, current + &c.to_string());
                }
                _ => return ConsoleOps::new(),
            }
        }

        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.quit = true;
                ConsoleOps::new()
            }
            KeyCode::Char(' ') => {
                self.viewport.reset_page();
                self.dispatch(ViewportEvent::MoveDown(self.height()))
            }
            KeyCode::Enter => {
                let width = self.viewport_width();
                let auto_wrap = self.auto_wrap();
                let filter_active = self.filter_active;
                let store = self.store.clone();
                if let Some(export) = self.selection.copy(&store, width, &self.patterns, auto_wrap, filter_active) {
                    let _ = self.clipboard.publish(&export.plain, &export.html);
                }
                ConsoleOps::new()
            }
            KeyCode::Up => self.dispatch(ViewportEvent::MoveUp(1)),
            KeyCode::Down => self.dispatch(ViewportEvent::MoveDown(1)),
            KeyCode::Left => self.dispatch(ViewportEvent::MoveLeft(1)),
            KeyCode::Right => self.dispatch(ViewportEvent::MoveRight(1)),
            KeyCode::PageUp => self.dispatch(ViewportEvent::MoveUp(self.height())),
            KeyCode::PageDown => {
                self.viewport.reset_page();
                self.dispatch(ViewportEvent::MoveDown(self.height()))
            }
            KeyCode::Tab => self.toggle_filter(),
            _ => ConsoleOps::new(),
        }
    }

    /// Flip filter-to-matches mode (spec.md §1, §4.D). Recomputes the
    /// store's filtered list against the active patterns before telling the
    /// viewport to walk it, so `ViewportState::use_filtered` and
    /// `LineStore`'s filtered links never disagree about which list is
    /// current.
    fn toggle_filter(&mut self) -> ConsoleOps {
        self.filter_active = !self.filter_active;
        let anchor = self.top_anchor();
        let patterns = &self.patterns;
        let new_anchor = self.store.recompute_filter(|s| patterns.matches(s), anchor.as_ref());
        self.viewport.set_filter_active(self.filter_active);

        let auto_wrap = self.auto_wrap();
        let store = self.store.clone();
        self.viewport.regenerate(new_anchor.or(anchor), &store, &self.patterns, auto_wrap)
    }

    /// Slot currently assigned to `color`, allocating an empty one if this
    /// is the first time it's been selected this session. Looks up the
    /// existing slot first — `PatternTable::index_for_color` overwrites
    /// whatever pattern is already there, so it can't be used as a pure
    /// lookup.
    fn slot_for(&mut self, color: Attr) -> usize {
        if let Some(slot) = (0..self.patterns.len()).find(|&i| self.patterns.color_at(i) == Some(color)) {
            return slot;
        }
        self.patterns.index_for_color(color, "").unwrap_or(0)
    }

    fn update_pattern(&mut self, color: Attr, pattern: String) -> ConsoleOps {
        if pattern.is_empty() {
            let slot = self.slot_for(color);
            self.patterns.free(slot);
        } else {
            self.patterns.index_for_color(color, &pattern);
        }

        let auto_wrap = self.auto_wrap();
        if self.filter_active {
            let anchor = self.top_anchor();
            let patterns = &self.patterns;
            self.store.recompute_filter(|s| patterns.matches(s), anchor.as_ref());
        }
        let anchor = self.top_anchor();
        let store = self.store.clone();
        self.viewport.regenerate(anchor, &store, &self.patterns, auto_wrap)
    }
}
