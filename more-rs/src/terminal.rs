//! Console sink — spec.md §6: `get_size`, `set_cursor`, `fill_cells`,
//! `scroll_region`, `write_text`, `set_window_info`. Crossterm-backed,
//! grounding the same rendering shape as the teacher's `Terminal` (raw
//! mode guard, queued crossterm commands, one flush per batch) but
//! interpreting [`ConsoleOp`]s from `viewport.rs` instead of a `Screen`.

use std::io::{self, Write};

use crossterm::style::{Color, ContentStyle, Print, ResetColor, SetStyle};
use crossterm::terminal::{ClearType, ScrollDown, ScrollUp};
use crossterm::{cursor, queue, terminal};

use crate::attr::{ansi_color_name, Attr};
use crate::statusline::StatusText;
use crate::viewport::{ConsoleOp, ConsoleOps};

/// The console sink contract from spec.md §6. A trait so the viewport's
/// rendering can be exercised in tests without a real terminal.
pub trait ConsoleSink {
    fn get_size(&self) -> (u16, u16);
    fn set_cursor(&mut self, x: u16, y: u16) -> io::Result<()>;
    fn fill_cells(&mut self, x: u16, y: u16, count: u16, ch: char, attr: Attr) -> io::Result<()>;
    /// Positive `rows` scrolls content up; negative scrolls down
    /// (spec.md §4.E / `ConsoleOp::ScrollRegion`).
    fn scroll_region(&mut self, rows: i32) -> io::Result<()>;
    /// `text` may itself contain VT/CSI escapes injected by the logical-line
    /// generator (search highlights) — written as-is, since the real
    /// terminal interprets SGR sequences natively.
    fn write_text(&mut self, x: u16, y: u16, text: &str) -> io::Result<()>;
    fn set_window_info(&mut self, left: u16, top: u16, right: u16, bottom: u16);
    fn flush(&mut self) -> io::Result<()>;
    /// Reported at startup (spec.md §6): whether the console auto-wraps at
    /// the last column, determining whether the logical-line generator
    /// sets `explicit_newline_required`.
    fn auto_wrap(&self) -> bool;

    /// Update stored dimensions after a resize event. No-op by default;
    /// backends that cache their size override it.
    fn handle_resize(&mut self, width: u16, height: u16) {
        let _ = (width, height);
    }

    /// Erase `row` and write `status` in its own attribute (spec.md §4.H:
    /// "erases its row before each redraw"). The default drops the
    /// attribute (the trait's `write_text` carries no color); backends
    /// able to set style override it to honor `status.attr`.
    fn render_status(&mut self, row: u16, status: &StatusText) -> io::Result<()> {
        let (width, _) = self.get_size();
        self.fill_cells(0, row, width, ' ', status.attr)?;
        self.write_text(0, row, &status.text)?;
        self.flush()
    }

    /// Execute a batch of [`ConsoleOp`]s produced by `ViewportState`, in
    /// order, then flush once.
    fn apply(&mut self, ops: &ConsoleOps) -> io::Result<()> {
        for op in ops {
            match op {
                ConsoleOp::MoveCursor { x, y } => self.set_cursor(*x, *y)?,
                ConsoleOp::FillCells { x, y, count, ch, attr } => self.fill_cells(*x, *y, *count, *ch, *attr)?,
                ConsoleOp::ScrollRegion { rows } => self.scroll_region(*rows)?,
                ConsoleOp::WriteText { x, y, text } => self.write_text(*x, *y, text)?,
            }
        }
        self.flush()
    }
}

/// Crossterm `Color` for a 4-bit palette index, sharing the same name
/// table as `attr::ansi_color_name` (the single source of truth for the
/// palette order) rather than duplicating it.
fn crossterm_color(index: u8) -> Color {
    match ansi_color_name(index) {
        "black" => Color::Black,
        "maroon" => Color::DarkRed,
        "green" => Color::DarkGreen,
        "olive" => Color::DarkYellow,
        "navy" => Color::DarkBlue,
        "purple" => Color::DarkMagenta,
        "teal" => Color::DarkCyan,
        "silver" => Color::Grey,
        "gray" => Color::DarkGrey,
        "red" => Color::Red,
        "lime" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "fuchsia" => Color::Magenta,
        "aqua" => Color::Cyan,
        "white" => Color::White,
        _ => Color::Reset,
    }
}

/// Map an `Attr` to a crossterm `ContentStyle`. `Attr::DEFAULT` maps to no
/// explicit colors at all, so the terminal's own default palette shows
/// through rather than being overridden with black-on-white.
pub fn attr_style(attr: Attr) -> ContentStyle {
    let mut style = ContentStyle::new();
    if attr != Attr::DEFAULT {
        let (fg, bg) = attr.effective_fg_bg();
        style.foreground_color = Some(crossterm_color(fg));
        style.background_color = Some(crossterm_color(bg));
    }
    style
}

// ── CrosstermConsole ──────────────────────────────────────────────────────

/// Wraps `stdout` with crossterm commands, implementing [`ConsoleSink`].
pub struct CrosstermConsole {
    width: u16,
    height: u16,
    left: u16,
    top: u16,
    right: u16,
    bottom: u16,
    /// Reported at startup (spec.md §6): whether the terminal auto-wraps
    /// at the last column. crossterm has no query for this; assumed true,
    /// matching virtually every modern terminal emulator.
    auto_wrap: bool,
    out: Box<dyn Write + Send>,
}

impl CrosstermConsole {
    /// Create a console writing to the given writer. Queries the current
    /// terminal size, falling back to 80x24 if unavailable.
    pub fn new(out: impl Write + Send + 'static) -> io::Result<Self> {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Ok(Self { width, height, left: 0, top: 0, right: width, bottom: height, auto_wrap: true, out: Box::new(out) })
    }

    /// Enable raw mode. Returns a guard that disables it on drop.
    pub fn enter_raw_mode() -> io::Result<RawModeGuard> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard(()))
    }

    /// Clear the whole screen and home the cursor.
    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
    }
}

impl ConsoleSink for CrosstermConsole {
    fn get_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(x, y))
    }

    fn fill_cells(&mut self, x: u16, y: u16, count: u16, ch: char, attr: Attr) -> io::Result<()> {
        let text: String = std::iter::repeat(ch).take(count as usize).collect();
        queue!(self.out, cursor::MoveTo(x, y), SetStyle(attr_style(attr)), Print(&text), ResetColor)
    }

    fn scroll_region(&mut self, rows: i32) -> io::Result<()> {
        // crossterm has no scroll-region primitive — approximate with a
        // whole-screen scroll (spec.md §6 AMBIENT); the viewport always
        // follows a `ScrollRegion` with `WriteText`/`FillCells` ops that
        // repaint whatever the approximation got wrong outside the
        // nominal region.
        match rows.cmp(&0) {
            std::cmp::Ordering::Greater => queue!(self.out, ScrollUp(rows as u16)),
            std::cmp::Ordering::Less => queue!(self.out, ScrollDown((-rows) as u16)),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }

    fn write_text(&mut self, x: u16, y: u16, text: &str) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(x, y), Print(text))
    }

    fn set_window_info(&mut self, left: u16, top: u16, right: u16, bottom: u16) {
        self.left = left;
        self.top = top;
        self.right = right;
        self.bottom = bottom;
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn auto_wrap(&self) -> bool {
        self.auto_wrap
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Always rendered in the status's own attribute (bright white),
    /// overriding the trait default to preserve `status.attr`.
    fn render_status(&mut self, row: u16, status: &StatusText) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(0, row), terminal::Clear(ClearType::UntilNewLine))?;
        queue!(self.out, SetStyle(attr_style(status.attr)), Print(&status.text), ResetColor)?;
        self.out.flush()
    }
}

// ── RawModeGuard ──────────────────────────────────────────────────────────

/// RAII guard: disables raw mode when dropped.
pub struct RawModeGuard(());

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), cursor::Show, cursor::MoveTo(0, 0));
        let _ = terminal::disable_raw_mode();
    }
}
