//! Status line — spec.md §4.H, grounded on the teacher's `StatusLine`: "a
//! plain string pre-formatted by the caller, with an optional attribute"
//! (`terminal.rs`). This module only formats; `terminal.rs` erases the row
//! and writes it.

use crate::attr::color::{BRIGHT, WHITE};
use crate::attr::Attr;
use crate::viewport::ViewportState;

/// Pre-formatted status bar content, ready for `terminal.rs` to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub text: String,
    pub attr: Attr,
}

fn display_line_number(row: &crate::viewport::DisplayRow, filtered_active: bool) -> Option<u64> {
    if filtered_active {
        row.physical_line.filtered_line_number()
    } else {
        Some(row.physical_line.line_number())
    }
}

/// Format the status bar per spec.md §4.H:
/// ` --- <state> --- (<first>-<last> of <total>, <percent>%)`.
///
/// `total` is the total or filtered line count matching `filtered_active`
/// (the caller picks `store.total_count()` or `store.filtered_count()`).
pub fn render(total: usize, filtered_active: bool, view: &ViewportState, ingest_done: bool) -> StatusText {
    let rows = view.display();
    let first = rows.first().and_then(|r| display_line_number(r, filtered_active));
    let last = rows.last().and_then(|r| display_line_number(r, filtered_active));

    let at_tail = match (last, rows.last()) {
        (Some(n), Some(row)) => n == total as u64 && !row.more_logical_lines,
        _ => false,
    };

    let state = if ingest_done && at_tail {
        "End"
    } else if rows.len() < view.height() {
        "Awaiting data"
    } else {
        "More"
    };

    let percent = if total == 0 {
        100
    } else {
        last.map(|l| (l * 100) / total as u64).unwrap_or(0)
    };

    let text = format!(" --- {state} --- ({}-{} of {total}, {percent}%)", first.unwrap_or(0), last.unwrap_or(0));

    StatusText { text, attr: Attr::from_fg_bg(WHITE | BRIGHT, 0) }
}
